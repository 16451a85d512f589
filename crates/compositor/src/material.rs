//! Materials and the reflected layout pass construction validates against.

use crate::backend::MaterialId;
use crate::types::PassKind;

/// Shader symbol names shared by the stock materials and custom post shaders.
pub mod names {
    pub const MVP_BLOCK: &str = "mvp";
    pub const MODEL_MATRIX: &str = "modelMatrix";
    pub const VIEW_MATRIX: &str = "viewMatrix";
    pub const PROJECTION_MATRIX: &str = "projectionMatrix";

    pub const PARAM_BLOCK: &str = "UBO";
    pub const TOP_LEFT: &str = "topLeft";
    pub const TOP_RIGHT: &str = "topRight";
    pub const BOTTOM_LEFT: &str = "bottomLeft";
    pub const BOTTOM_RIGHT: &str = "bottomRight";
    pub const FRAME_THICKNESS: &str = "frameThickness";
    pub const MOUSE_POS: &str = "mousePos";
    pub const TIME: &str = "time";

    pub const Y_TEXTURE: &str = "yTexture";
    pub const U_TEXTURE: &str = "uTexture";
    pub const V_TEXTURE: &str = "vTexture";
    pub const IN_TEXTURE: &str = "inTexture";
    pub const MASK_TEXTURE: &str = "maskTexture";
}

/// Scalar shape of a uniform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    /// Byte offset inside the block.
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub name: String,
    /// Size of the block in bytes, including trailing padding.
    pub size: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlockLayout {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// Uniform blocks and sampled textures exposed by a compiled shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialLayout {
    pub blocks: Vec<UniformBlockLayout>,
    /// Sampled texture names, in binding order.
    pub samplers: Vec<String>,
}

impl MaterialLayout {
    pub fn block(&self, name: &str) -> Option<&UniformBlockLayout> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn has_sampler(&self, name: &str) -> bool {
        self.samplers.iter().any(|sampler| sampler == name)
    }

    /// Binding slot of a sampled texture inside the texture bind group.
    pub fn sampler_index(&self, name: &str) -> Option<usize> {
        self.samplers.iter().position(|sampler| sampler == name)
    }
}

/// A compiled shader, shared by every pass that draws with it.
#[derive(Debug)]
pub struct Material {
    id: MaterialId,
    name: String,
    layout: MaterialLayout,
}

impl Material {
    pub fn new(id: MaterialId, name: impl Into<String>, layout: MaterialLayout) -> Self {
        Self {
            id,
            name: name.into(),
            layout,
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &MaterialLayout {
        &self.layout
    }
}

fn member(name: &str, offset: u32, kind: UniformKind) -> UniformMember {
    UniformMember {
        name: name.to_string(),
        offset,
        kind,
    }
}

/// Layout of the `mvp` block every pass carries.
pub fn mvp_block_layout() -> UniformBlockLayout {
    UniformBlockLayout {
        name: names::MVP_BLOCK.to_string(),
        size: 192,
        members: vec![
            member(names::MODEL_MATRIX, 0, UniformKind::Mat4),
            member(names::VIEW_MATRIX, 64, UniformKind::Mat4),
            member(names::PROJECTION_MATRIX, 128, UniformKind::Mat4),
        ],
    }
}

/// Name under which backends register the stock material of `kind`.
pub fn stock_material_name(kind: PassKind) -> String {
    format!("stock-{kind}")
}

/// Layout of the stock material for a pass kind.
///
/// The custom post entry describes the minimal contract a user shader meets:
/// an `mvp` block, an `inTexture` sampler and a `UBO` block with `time`.
pub fn stock_layout(kind: PassKind) -> MaterialLayout {
    let mut blocks = vec![mvp_block_layout()];
    match kind {
        PassKind::Video | PassKind::Mask => {}
        PassKind::CustomPost => blocks.push(UniformBlockLayout {
            name: names::PARAM_BLOCK.to_string(),
            size: 4,
            members: vec![member(names::TIME, 0, UniformKind::Float)],
        }),
        PassKind::Interface => blocks.push(UniformBlockLayout {
            name: names::PARAM_BLOCK.to_string(),
            size: 16,
            members: vec![
                member(names::MOUSE_POS, 0, UniformKind::Vec3),
                member(names::FRAME_THICKNESS, 12, UniformKind::Float),
            ],
        }),
        PassKind::Warp => blocks.push(UniformBlockLayout {
            name: names::PARAM_BLOCK.to_string(),
            size: 64,
            members: vec![
                member(names::TOP_LEFT, 0, UniformKind::Vec3),
                member(names::TOP_RIGHT, 16, UniformKind::Vec3),
                member(names::BOTTOM_LEFT, 32, UniformKind::Vec3),
                member(names::BOTTOM_RIGHT, 48, UniformKind::Vec3),
            ],
        }),
    }

    MaterialLayout {
        blocks,
        samplers: kind
            .sampler_roles()
            .iter()
            .map(|role| role.shader_name().to_string())
            .collect(),
    }
}
