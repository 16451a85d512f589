use std::fmt;

use glam::Vec2;

/// Clear color of every canvas-owned target: white with zero alpha.
pub const OUTPUT_CLEAR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.0];

/// The kinds of shading passes a canvas can run.
///
/// Ordering follows the data flow through a canvas, which keeps sparse pass
/// maps iterating in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassKind {
    /// Planar YUV to RGB conversion of the video source.
    Video,
    /// Optional user-supplied post effect.
    CustomPost,
    /// Optional alpha mask.
    Mask,
    /// Overlay drawn into a preview target on request.
    Interface,
    /// Corner-pin warp onto a presented surface.
    Warp,
}

impl PassKind {
    pub const ALL: [PassKind; 5] = [
        PassKind::Video,
        PassKind::CustomPost,
        PassKind::Mask,
        PassKind::Interface,
        PassKind::Warp,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Video => "video",
            PassKind::CustomPost => "custom-post",
            PassKind::Mask => "mask",
            PassKind::Interface => "interface",
            PassKind::Warp => "warp",
        }
    }

    /// Blend state of the material instance created for this pass.
    pub fn blend_mode(self) -> BlendMode {
        match self {
            PassKind::Video => BlendMode::Opaque,
            _ => BlendMode::AlphaBlend,
        }
    }

    pub fn depth_mode(self) -> DepthMode {
        DepthMode::NoReadWrite
    }

    /// Sampler slots every material for this pass must declare.
    pub fn sampler_roles(self) -> &'static [SamplerRole] {
        match self {
            PassKind::Video => &[SamplerRole::Y, SamplerRole::U, SamplerRole::V],
            PassKind::Mask => &[SamplerRole::Input, SamplerRole::Mask],
            PassKind::CustomPost | PassKind::Interface | PassKind::Warp => &[SamplerRole::Input],
        }
    }

    /// Members the pass requires inside its `UBO` parameter block.
    ///
    /// `None` means the pass has no parameter block at all.
    pub fn required_params(self) -> Option<&'static [&'static str]> {
        use crate::material::names;
        match self {
            PassKind::Video | PassKind::Mask => None,
            PassKind::CustomPost => Some(&[]),
            PassKind::Interface => Some(&[names::FRAME_THICKNESS, names::MOUSE_POS]),
            PassKind::Warp => Some(&[
                names::TOP_LEFT,
                names::TOP_RIGHT,
                names::BOTTOM_LEFT,
                names::BOTTOM_RIGHT,
            ]),
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Color blending applied when a pass writes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    AlphaBlend,
}

/// Depth handling; canvases never read or write depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthMode {
    NoReadWrite,
}

/// Symbolic sampler slots of a pass, independent of the shader variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SamplerRole {
    Y,
    U,
    V,
    Input,
    Mask,
}

impl SamplerRole {
    /// Symbolic slot name used in logs and errors.
    pub fn symbol(self) -> &'static str {
        match self {
            SamplerRole::Y => "YSampler",
            SamplerRole::U => "USampler",
            SamplerRole::V => "VSampler",
            SamplerRole::Input => "inTextureSampler",
            SamplerRole::Mask => "maskSampler",
        }
    }

    /// Name of the sampled texture inside the shader.
    pub fn shader_name(self) -> &'static str {
        use crate::material::names;
        match self {
            SamplerRole::Y => names::Y_TEXTURE,
            SamplerRole::U => names::U_TEXTURE,
            SamplerRole::V => names::V_TEXTURE,
            SamplerRole::Input => names::IN_TEXTURE,
            SamplerRole::Mask => names::MASK_TEXTURE,
        }
    }
}

impl fmt::Display for SamplerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Placement of a canvas on its destination surface.
///
/// `translate` is expressed in fractions of the destination size and `scale`
/// multiplies the fitted extent. `rotation` (radians) is carried for
/// configuration compatibility but is not applied when fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pub translate: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}
