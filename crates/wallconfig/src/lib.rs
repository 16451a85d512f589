use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Largest width or height accepted for sources, canvases and the output.
pub const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse wall configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid wall configuration: {0}")]
    Invalid(String),
}

/// A video wall: one output surface and the canvases placed on it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WallConfig {
    pub version: u32,
    #[serde(
        default = "default_frame_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub frame_interval: Duration,
    pub output: OutputConfig,
    #[serde(default)]
    pub canvases: Vec<CanvasConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CanvasConfig {
    pub name: String,
    /// Output height in pixels.
    #[serde(default)]
    pub resolution: Option<u32>,
    #[serde(default)]
    pub aspect_ratio: Option<f32>,
    /// Grayscale mask image, relative to the wall file.
    #[serde(default)]
    pub mask: Option<PathBuf>,
    /// WGSL post effect, relative to the wall file.
    #[serde(default)]
    pub post_shader: Option<PathBuf>,
    /// Inward corner offsets in the order top-left, top-right, bottom-left,
    /// bottom-right.
    #[serde(default)]
    pub corner_offsets: [[f32; 2]; 4],
    #[serde(default)]
    pub translate: [f32; 2],
    #[serde(default = "default_scale")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub rotation: f32,
    pub source: SourceConfig,
}

/// Synthetic source feeding a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub pattern: SourcePattern,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePattern {
    #[default]
    Bars,
    Gradient,
    Checker,
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourcePattern::Bars => "bars",
            SourcePattern::Gradient => "gradient",
            SourcePattern::Checker => "checker",
        })
    }
}

fn default_frame_interval() -> Duration {
    Duration::from_micros(16_667)
}

fn default_scale() -> [f32; 2] {
    [1.0, 1.0]
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl WallConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: WallConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn canvas(&self, name: &str) -> Option<&CanvasConfig> {
        self.canvases.iter().find(|canvas| canvas.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::Invalid(
                "output width and height must be greater than zero".into(),
            ));
        }

        if self.output.width > MAX_DIMENSION || self.output.height > MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "output {}x{} exceeds the {MAX_DIMENSION} pixel limit",
                self.output.width, self.output.height
            )));
        }

        if self.frame_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "frame_interval must be greater than zero".into(),
            ));
        }

        if self.canvases.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one canvas".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for canvas in &self.canvases {
            let name = canvas.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("canvas name may not be empty".into()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "canvas '{name}' is defined more than once"
                )));
            }
            canvas.validate()?;
        }

        Ok(())
    }
}

impl CanvasConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.name;
        if self.source.width == 0 || self.source.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas '{name}' source width and height must be greater than zero"
            )));
        }

        if self.source.width > MAX_DIMENSION || self.source.height > MAX_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "canvas '{name}' source {}x{} exceeds the {MAX_DIMENSION} pixel limit",
                self.source.width, self.source.height
            )));
        }

        if self.resolution == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "canvas '{name}' resolution must be greater than zero"
            )));
        }

        if let Some(aspect) = self.aspect_ratio {
            if !aspect.is_finite() || aspect <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "canvas '{name}' aspect_ratio must be a positive number"
                )));
            }
        }

        if let Some(resolution) = self.resolution {
            let aspect = self
                .aspect_ratio
                .unwrap_or(self.source.width as f32 / self.source.height as f32);
            let width = (resolution as f32 * aspect).round();
            if resolution > MAX_DIMENSION || width > MAX_DIMENSION as f32 {
                return Err(ConfigError::Invalid(format!(
                    "canvas '{name}' resolution {resolution} gives a {width}x{resolution} output, \
                     beyond the {MAX_DIMENSION} pixel limit"
                )));
            }
        }

        let all_finite = self
            .corner_offsets
            .iter()
            .flatten()
            .chain(&self.translate)
            .chain(&self.scale)
            .chain(std::iter::once(&self.rotation))
            .all(|value| value.is_finite());
        if !all_finite {
            return Err(ConfigError::Invalid(format!(
                "canvas '{name}' placement values must be finite"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
frame_interval = "40ms"

[output]
width = 1920
height = 1080

[[canvases]]
name = "left"
resolution = 480
mask = "masks/left.png"
corner_offsets = [[0.02, 0.0], [0.0, 0.0], [0.0, 0.0], [0.0, 0.05]]
translate = [-0.25, 0.0]
scale = [0.5, 1.0]

[canvases.source]
width = 640
height = 480

[[canvases]]
name = "right"
post_shader = "shaders/ripple.wgsl"
aspect_ratio = 1.5
rotation = 0.1

[canvases.source]
width = 1280
height = 720
pattern = "checker"
"#;

    #[test]
    fn parses_sample_config() {
        let config = WallConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.frame_interval, Duration::from_millis(40));
        assert_eq!(config.output, OutputConfig { width: 1920, height: 1080 });
        assert_eq!(config.canvases.len(), 2);

        let left = config.canvas("left").unwrap();
        assert_eq!(left.resolution, Some(480));
        assert_eq!(left.mask.as_deref(), Some(std::path::Path::new("masks/left.png")));
        assert_eq!(left.corner_offsets[3], [0.0, 0.05]);
        assert_eq!(left.source.pattern, SourcePattern::Bars);

        let right = config.canvas("right").unwrap();
        assert_eq!(right.scale, [1.0, 1.0]);
        assert_eq!(right.translate, [0.0, 0.0]);
        assert_eq!(right.source.pattern, SourcePattern::Checker);
    }

    #[test]
    fn frame_interval_defaults_and_accepts_seconds() {
        let base = r#"
version = 1
[output]
width = 10
height = 10
[[canvases]]
name = "a"
[canvases.source]
width = 4
height = 4
"#;
        let config = WallConfig::from_toml_str(base).unwrap();
        assert_eq!(config.frame_interval, Duration::from_micros(16_667));

        let config = WallConfig::from_toml_str(&format!("frame_interval = 0.5\n{base}")).unwrap();
        assert_eq!(config.frame_interval, Duration::from_millis(500));
    }

    #[test]
    fn rejects_duplicate_canvas_names() {
        let config = r#"
version = 1
[output]
width = 10
height = 10
[[canvases]]
name = "a"
[canvases.source]
width = 4
height = 4
[[canvases]]
name = "a"
[canvases.source]
width = 4
height = 4
"#;
        let err = WallConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("'a'")));
    }

    #[test]
    fn rejects_degenerate_source() {
        let config = r#"
version = 1
[output]
width = 10
height = 10
[[canvases]]
name = "empty"
[canvases.source]
width = 0
height = 4
"#;
        let err = WallConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("empty")));
    }

    #[test]
    fn rejects_oversized_source_and_resolution() {
        let config = r#"
version = 1
[output]
width = 10
height = 10
[[canvases]]
name = "huge"
[canvases.source]
width = 70000
height = 70000
"#;
        let err = WallConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("huge")));

        let err = WallConfig::from_toml_str(
            &SAMPLE.replace("resolution = 480", "resolution = 20000"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("left")));

        // 16384 rows at 1.5:1 would be 24576 pixels wide.
        let err = WallConfig::from_toml_str(
            &SAMPLE.replace("aspect_ratio = 1.5", "aspect_ratio = 1.5\nresolution = 16384"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("right")));

        let err = WallConfig::from_toml_str(&SAMPLE.replace("width = 1920", "width = 20000"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("output")));
    }

    #[test]
    fn rejects_unknown_version_and_bad_aspect() {
        let err = WallConfig::from_toml_str(&SAMPLE.replace("version = 1", "version = 2"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = WallConfig::from_toml_str(
            &SAMPLE.replace("aspect_ratio = 1.5", "aspect_ratio = -1.0"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("right")));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = WallConfig::from_toml_str("version = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
