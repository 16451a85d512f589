//! WGSL sources of the stock materials.

use crate::types::PassKind;

/// MVP block, vertex output and the plain plane vertex stage.
const PRELUDE: &str = r#"
struct Mvp {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> mvp: Mvp;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

fn project(position: vec3<f32>) -> vec4<f32> {
    return mvp.projectionMatrix * mvp.viewMatrix * mvp.modelMatrix * vec4<f32>(position, 1.0);
}
"#;

const PLANE_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = project(position);
    out.uv = uv;
    return out;
}
"#;

/// BT.601 video-range YUV to RGB.
const VIDEO: &str = r#"
@group(1) @binding(0) var yTexture: texture_2d<f32>;
@group(1) @binding(1) var yTextureSampler: sampler;
@group(1) @binding(2) var uTexture: texture_2d<f32>;
@group(1) @binding(3) var uTextureSampler: sampler;
@group(1) @binding(4) var vTexture: texture_2d<f32>;
@group(1) @binding(5) var vTextureSampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let y = 1.1643 * (textureSample(yTexture, yTextureSampler, in.uv).r - 0.0625);
    let u = textureSample(uTexture, uTextureSampler, in.uv).r - 0.5;
    let v = textureSample(vTexture, vTextureSampler, in.uv).r - 0.5;
    let rgb = vec3<f32>(
        y + 1.5958 * v,
        y - 0.39173 * u - 0.8129 * v,
        y + 2.017 * u,
    );
    return vec4<f32>(clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

const MASK: &str = r#"
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;
@group(1) @binding(2) var maskTexture: texture_2d<f32>;
@group(1) @binding(3) var maskTextureSampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(inTexture, inTextureSampler, in.uv);
    let mask = textureSample(maskTexture, maskTextureSampler, in.uv);
    return vec4<f32>(color.rgb, color.a * mask.r);
}
"#;

/// Border of `frameThickness` (in uv units) plus a dot at `mousePos.xy`.
const INTERFACE: &str = r#"
struct InterfaceParams {
    mousePos: vec3<f32>,
    frameThickness: f32,
};

@group(0) @binding(1) var<uniform> UBO: InterfaceParams;
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(inTexture, inTextureSampler, in.uv);
    let t = UBO.frameThickness;
    let edge = min(min(in.uv.x, 1.0 - in.uv.x), min(in.uv.y, 1.0 - in.uv.y));
    if (edge < t) {
        return vec4<f32>(1.0, 0.55, 0.0, 1.0);
    }
    if (distance(in.uv, UBO.mousePos.xy) < 0.015) {
        return vec4<f32>(1.0, 1.0, 1.0, 1.0);
    }
    return color;
}
"#;

/// Bilinear corner displacement in the vertex stage.
const WARP: &str = r#"
struct WarpParams {
    topLeft: vec3<f32>,
    topRight: vec3<f32>,
    bottomLeft: vec3<f32>,
    bottomRight: vec3<f32>,
};

@group(0) @binding(1) var<uniform> UBO: WarpParams;
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    let top = mix(UBO.topLeft, UBO.topRight, uv.x);
    let bottom = mix(UBO.bottomLeft, UBO.bottomRight, uv.x);
    var out: VertexOutput;
    out.position = project(position + mix(top, bottom, uv.y));
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(inTexture, inTextureSampler, in.uv);
}
"#;

/// Pass-through post effect, used when a custom post shader is needed but
/// none is configured.
pub const PASSTHROUGH_POST: &str = r#"
struct PostParams {
    time: f32,
};

@group(0) @binding(1) var<uniform> UBO: PostParams;
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(inTexture, inTextureSampler, in.uv);
}
"#;

/// Full WGSL source of the stock material for `kind`.
pub fn stock_source(kind: PassKind) -> String {
    match kind {
        PassKind::Video => format!("{PRELUDE}{PLANE_VERTEX}{VIDEO}"),
        PassKind::Mask => format!("{PRELUDE}{PLANE_VERTEX}{MASK}"),
        PassKind::Interface => format!("{PRELUDE}{PLANE_VERTEX}{INTERFACE}"),
        PassKind::Warp => format!("{PRELUDE}{WARP}"),
        PassKind::CustomPost => format!("{PRELUDE}{PLANE_VERTEX}{PASSTHROUGH_POST}"),
    }
}
