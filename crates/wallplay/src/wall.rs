//! Builds a [`CanvasGroup`] from a wall description on any backend.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use compositor::{
    Canvas, CanvasDescriptor, CanvasGroup, CanvasTransform, CornerOffsets, RenderBackend,
    RenderTarget, RenderTargetDesc, StaticVideoSource, SteppedTimeSource, TextureDesc,
    TextureFormat, TextureId, YuvPlanes,
};
use glam::{UVec2, Vec2};
use wallconfig::{CanvasConfig, WallConfig};

use crate::pattern;

/// Clear colour of presented surfaces.
pub const SURFACE_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub struct LoadedWall {
    pub path: PathBuf,
    pub config: WallConfig,
}

impl LoadedWall {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read wall file {}", path.display()))?;
        let config = WallConfig::from_toml_str(&raw)
            .with_context(|| format!("failed to load wall file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// Resolves a path from the wall file relative to the file's directory.
    pub fn asset_path(&self, relative: &Path) -> PathBuf {
        match self.path.parent() {
            Some(parent) if relative.is_relative() => parent.join(relative),
            _ => relative.to_path_buf(),
        }
    }

    pub fn output_size(&self) -> UVec2 {
        UVec2::new(self.config.output.width, self.config.output.height)
    }

    /// Uploads sources, masks and post shaders, then builds every canvas.
    pub fn build(&self, backend: &mut dyn RenderBackend) -> Result<CanvasGroup> {
        let mut group = CanvasGroup::default();
        for canvas in &self.config.canvases {
            let built = self
                .build_canvas(backend, canvas)
                .with_context(|| format!("failed to build canvas '{}'", canvas.name))?;
            group.push(built);
        }
        tracing::debug!(canvases = group.canvases().len(), "wall built");
        Ok(group)
    }

    fn build_canvas(&self, backend: &mut dyn RenderBackend, config: &CanvasConfig) -> Result<Canvas> {
        let source_size = UVec2::new(config.source.width, config.source.height);
        let planes = upload_pattern(backend, config, source_size)?;
        let (source, _switcher) = StaticVideoSource::new(source_size, planes);

        let mut descriptor = CanvasDescriptor::new(config.name.clone());
        descriptor.resolution = config.resolution;
        descriptor.aspect_ratio = config.aspect_ratio;
        descriptor.corner_offsets = CornerOffsets::from_array(config.corner_offsets);
        descriptor.transform = CanvasTransform {
            translate: Vec2::from(config.translate),
            scale: Vec2::from(config.scale),
            rotation: config.rotation,
        };
        if let Some(mask) = &config.mask {
            descriptor.mask = Some(self.upload_mask(backend, &config.name, mask)?);
        }
        if let Some(shader) = &config.post_shader {
            let path = self.asset_path(shader);
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read post shader {}", path.display()))?;
            let material = backend
                .load_material(&path.display().to_string(), &source)
                .with_context(|| format!("failed to load post shader {}", path.display()))?;
            descriptor.post_material = Some(material);
        }

        let time = SteppedTimeSource::new(0.0, self.config.frame_interval);
        Ok(Canvas::new(
            backend,
            descriptor,
            Box::new(source),
            Box::new(time),
        )?)
    }

    fn upload_mask(
        &self,
        backend: &mut dyn RenderBackend,
        canvas: &str,
        relative: &Path,
    ) -> Result<TextureId> {
        let path = self.asset_path(relative);
        let mask = image::open(&path)
            .with_context(|| format!("failed to open mask image {}", path.display()))?
            .to_luma8();
        tracing::debug!(
            canvas,
            path = %path.display(),
            width = mask.width(),
            height = mask.height(),
            "loaded mask"
        );
        backend.create_texture(
            &TextureDesc {
                label: format!("{canvas} mask"),
                size: UVec2::new(mask.width(), mask.height()),
                format: TextureFormat::R8,
            },
            mask.as_raw(),
        )
    }

    /// Creates the surface the wall is presented into.
    pub fn create_output_surface(&self, backend: &mut dyn RenderBackend) -> Result<RenderTarget> {
        create_surface(backend, "wall output", self.output_size())
    }
}

pub fn create_surface(
    backend: &mut dyn RenderBackend,
    label: &str,
    size: UVec2,
) -> Result<RenderTarget> {
    backend.create_render_target(&RenderTargetDesc {
        label: label.to_string(),
        size,
        clear_color: SURFACE_CLEAR_COLOR,
    })
}

fn upload_pattern(
    backend: &mut dyn RenderBackend,
    config: &CanvasConfig,
    size: UVec2,
) -> Result<YuvPlanes> {
    let frame = pattern::generate(config.source.pattern, size);
    let mut plane = |suffix: &str, size: UVec2, pixels: &[u8]| {
        backend.create_texture(
            &TextureDesc {
                label: format!("{} {suffix}", config.name),
                size,
                format: TextureFormat::R8,
            },
            pixels,
        )
    };
    Ok(YuvPlanes {
        y: plane("y", frame.size, &frame.y)?,
        u: plane("u", frame.chroma_size, &frame.u)?,
        v: plane("v", frame.chroma_size, &frame.v)?,
    })
}
