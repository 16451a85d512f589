//! The seam between the compositor and whatever executes its draws.
//!
//! A backend is handed explicitly to every operation that allocates resources
//! or records work. The compositor never reaches for a global renderer.

mod recording;

use std::sync::Arc;

use anyhow::Result;
use glam::UVec2;

use crate::material::Material;
use crate::mesh::PlaneMesh;
use crate::types::{BlendMode, DepthMode, PassKind};

pub use recording::{DrawRecord, RecordedEvent, RecordingBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u64);

/// Pixel formats of uploaded textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single 8-bit channel, used for planar video.
    R8,
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Byte length of a tightly packed image of `size`.
    pub fn byte_len(self, size: UVec2) -> usize {
        size.x as usize * size.y as usize * self.bytes_per_pixel() as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub size: UVec2,
    pub format: TextureFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub label: String,
    pub size: UVec2,
    pub clear_color: [f32; 4],
}

/// An RGBA8 color attachment that can also be sampled by later passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub id: TargetId,
    pub color: TextureId,
    pub size: UVec2,
    pub clear_color: [f32; 4],
}

/// Where the draws between `begin_recording` and `end_recording` go.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingScope {
    /// Offscreen work; each draw clears its own target.
    Headless,
    /// A presented surface, cleared once when the scope opens.
    Surface(RenderTarget),
}

/// A texture bound to a named shader sampler for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerBinding {
    pub name: &'static str,
    pub texture: TextureId,
}

/// Everything a backend needs to execute one pass.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub pass: PassKind,
    pub material: &'a Arc<Material>,
    pub blend: BlendMode,
    pub depth: DepthMode,
    pub target: &'a RenderTarget,
    pub mesh: PlaneMesh,
    pub mvp: &'a [u8],
    pub params: Option<&'a [u8]>,
    pub samplers: Vec<SamplerBinding>,
}

impl DrawCall<'_> {
    /// True when any bound sampler reads the texture being written.
    pub fn reads_target(&self) -> bool {
        self.samplers
            .iter()
            .any(|binding| binding.texture == self.target.color)
    }
}

/// Rendering services the compositor consumes.
pub trait RenderBackend {
    /// Shared stock material for a pass kind, compiled once per backend.
    fn stock_material(&mut self, kind: PassKind) -> Option<Arc<Material>>;

    /// Compiles a user-supplied WGSL material.
    fn load_material(&mut self, name: &str, source: &str) -> Result<Arc<Material>>;

    /// Creates a sampled texture filled with tightly packed `pixels`.
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId>;

    /// Replaces the contents of a texture created by `create_texture`.
    fn write_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<()>;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTarget>;

    /// Frees a render target and its color texture. Later draws naming it
    /// are dropped by the backend.
    fn release_render_target(&mut self, target: &RenderTarget);

    /// Opens a recording scope; `false` means the scope could not be opened
    /// and the caller skips its draws.
    fn begin_recording(&mut self, scope: RecordingScope) -> bool;

    fn submit(&mut self, draw: &DrawCall<'_>);

    fn end_recording(&mut self);
}
