//! CPU mirrors of the uniform blocks a pass uploads.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::material::{UniformBlockLayout, UniformKind};

/// The `mvp` block: model, view and projection matrices in that order.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MvpUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

unsafe impl Zeroable for MvpUniforms {}
unsafe impl Pod for MvpUniforms {}

impl Default for MvpUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            model: identity,
            view: identity,
            projection: identity,
        }
    }
}

impl MvpUniforms {
    pub fn set(&mut self, model: Mat4, view: Mat4, projection: Mat4) {
        self.model = model.to_cols_array_2d();
        self.view = view.to_cols_array_2d();
        self.projection = projection.to_cols_array_2d();
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
    }
}

/// Warp `UBO`: four corner displacements, each a vec3 padded to 16 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WarpUniforms {
    pub top_left: [f32; 4],
    pub top_right: [f32; 4],
    pub bottom_left: [f32; 4],
    pub bottom_right: [f32; 4],
}

unsafe impl Zeroable for WarpUniforms {}
unsafe impl Pod for WarpUniforms {}

impl WarpUniforms {
    pub fn top_left(&self) -> Vec3 {
        Vec3::from_slice(&self.top_left[..3])
    }

    pub fn top_right(&self) -> Vec3 {
        Vec3::from_slice(&self.top_right[..3])
    }

    pub fn bottom_left(&self) -> Vec3 {
        Vec3::from_slice(&self.bottom_left[..3])
    }

    pub fn bottom_right(&self) -> Vec3 {
        Vec3::from_slice(&self.bottom_right[..3])
    }
}

/// Interface `UBO`: cursor position followed by the frame thickness, which
/// fills the vec3's trailing padding.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InterfaceUniforms {
    pub mouse_pos: [f32; 3],
    pub frame_thickness: f32,
}

unsafe impl Zeroable for InterfaceUniforms {}
unsafe impl Pod for InterfaceUniforms {}

/// Parameter block of a user-supplied post material.
///
/// The block layout comes from the material, so the bytes are kept raw and
/// only the `time` member, when the shader declares it as a float, is written.
#[derive(Clone, Debug, PartialEq)]
pub struct PostUniforms {
    bytes: Vec<u8>,
    time_offset: Option<usize>,
}

impl PostUniforms {
    pub fn from_layout(block: &UniformBlockLayout) -> Self {
        let size = (block.size.max(16) as usize).next_multiple_of(16);
        let time_offset = block
            .member(crate::material::names::TIME)
            .filter(|member| member.kind == UniformKind::Float)
            .map(|member| member.offset as usize)
            .filter(|offset| offset + 4 <= size);
        Self {
            bytes: vec![0; size],
            time_offset,
        }
    }

    pub fn has_time(&self) -> bool {
        self.time_offset.is_some()
    }

    pub fn set_time(&mut self, seconds: f32) {
        if let Some(offset) = self.time_offset {
            self.bytes[offset..offset + 4].copy_from_slice(&seconds.to_ne_bytes());
        }
    }

    pub fn time(&self) -> Option<f32> {
        let offset = self.time_offset?;
        let raw: [u8; 4] = self.bytes[offset..offset + 4].try_into().ok()?;
        Some(f32::from_ne_bytes(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
