use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

const WALL: &str = r#"
version = 1
frame_interval = "40ms"

[output]
width = 640
height = 360

[[canvases]]
name = "left"
resolution = 120
mask = "masks/left.png"
post_shader = "shaders/tint.wgsl"
corner_offsets = [[0.01, 0.0], [0.0, 0.0], [0.0, 0.0], [0.0, 0.02]]
translate = [-0.25, 0.0]
scale = [0.5, 1.0]

[canvases.source]
width = 320
height = 240
pattern = "bars"

[[canvases]]
name = "right"
translate = [0.25, 0.0]
scale = [0.5, 1.0]

[canvases.source]
width = 160
height = 90
pattern = "checker"
"#;

const TINT: &str = r#"
struct Mvp {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
};
struct Params { tint: vec3<f32>, time: f32 };
@group(0) @binding(0) var<uniform> mvp: Mvp;
@group(0) @binding(1) var<uniform> UBO: Params;
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};
@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = mvp.projectionMatrix * mvp.viewMatrix * mvp.modelMatrix * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(inTexture, inTextureSampler, in.uv);
    return vec4<f32>(color.rgb * (0.75 + 0.25 * sin(UBO.time)), color.a);
}
"#;

fn write_wall(root: &Path) -> PathBuf {
    fs::create_dir_all(root.join("masks")).unwrap();
    fs::create_dir_all(root.join("shaders")).unwrap();
    image::GrayImage::from_fn(32, 32, |x, _| image::Luma([if x < 16 { 255 } else { 0 }]))
        .save(root.join("masks/left.png"))
        .unwrap();
    fs::write(root.join("shaders/tint.wgsl"), TINT).unwrap();
    let path = root.join("wall.toml");
    fs::write(&path, WALL).unwrap();
    path
}

fn wallplay(config_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_wallplay"));
    command
        .env("WALLPLAY_CONFIG_DIR", config_dir)
        .env_remove("WALLPLAY_CONFIG")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn plan_json_lists_every_scope_and_draw() {
    let root = TempDir::new().unwrap();
    let wall = write_wall(root.path());

    let output = wallplay(root.path())
        .arg("plan")
        .arg(&wall)
        .args(["--json", "--select", "right"])
        .output()
        .expect("failed to run wallplay plan");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let scopes = plan["scopes"].as_array().unwrap();
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0]["scope"], "headless");

    let headless: Vec<_> = scopes[0]["draws"]
        .as_array()
        .unwrap()
        .iter()
        .map(|draw| draw["pass"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        headless,
        vec!["video", "custom-post", "mask", "video", "interface"]
    );

    let surface = scopes[1]["draws"].as_array().unwrap();
    assert_eq!(surface.len(), 2);
    assert!(surface.iter().all(|draw| draw["pass"] == "warp"));
    assert_eq!(surface[1]["samplers"][0]["texture"], "interface preview");
}

#[test]
fn default_wall_file_comes_from_config_dir() {
    let root = TempDir::new().unwrap();
    write_wall(root.path());

    let output = wallplay(root.path())
        .arg("check")
        .output()
        .expect("failed to run wallplay check");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("output=160x120"), "{stdout}");
    assert!(stdout.contains("passes=video+custom-post+mask"), "{stdout}");
    assert!(stdout.contains("output=160x90"), "{stdout}");

    let output = wallplay(root.path())
        .arg("where")
        .output()
        .expect("failed to run wallplay where");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(present)"), "{stdout}");
}

#[test]
fn invalid_wall_fails_with_canvas_name() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("broken.toml");
    fs::write(&path, WALL.replace("width = 160", "width = 0")).unwrap();

    let output = wallplay(root.path())
        .arg("check")
        .arg(&path)
        .output()
        .expect("failed to run wallplay check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("right"), "{stderr}");
}

#[test]
fn unknown_selection_is_rejected() {
    let root = TempDir::new().unwrap();
    let wall = write_wall(root.path());

    let output = wallplay(root.path())
        .arg("plan")
        .arg(&wall)
        .args(["--select", "center"])
        .output()
        .expect("failed to run wallplay plan");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown canvas 'center'"), "{stderr}");
}
