use glam::Vec2;

use crate::uniforms::WarpUniforms;

/// Per-corner displacement of the warped quad, in plane units.
///
/// Positive components always pull a corner towards the centre of the quad.
/// The sign flips applied when uploading keep that convention for every
/// corner, and existing wall calibrations depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CornerOffsets {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
}

impl CornerOffsets {
    /// The same inward offset on every corner.
    pub fn uniform(offset: Vec2) -> Self {
        Self {
            top_left: offset,
            top_right: offset,
            bottom_left: offset,
            bottom_right: offset,
        }
    }

    pub fn from_array(corners: [[f32; 2]; 4]) -> Self {
        Self {
            top_left: Vec2::from(corners[0]),
            top_right: Vec2::from(corners[1]),
            bottom_left: Vec2::from(corners[2]),
            bottom_right: Vec2::from(corners[3]),
        }
    }

    /// Shader-space displacements with the per-corner sign convention applied.
    pub fn to_uniforms(&self) -> WarpUniforms {
        WarpUniforms {
            top_left: [self.top_left.x, -self.top_left.y, 0.0, 0.0],
            top_right: [-self.top_right.x, -self.top_right.y, 0.0, 0.0],
            bottom_left: [self.bottom_left.x, self.bottom_left.y, 0.0, 0.0],
            bottom_right: [-self.bottom_right.x, self.bottom_right.y, 0.0, 0.0],
        }
    }
}
