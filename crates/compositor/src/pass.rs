use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use tracing::{debug, warn};

use crate::backend::{DrawCall, RenderTarget, SamplerBinding, TextureId};
use crate::error::PassError;
use crate::material::{names, stock_material_name, Material};
use crate::mesh::PlaneMesh;
use crate::types::{BlendMode, DepthMode, PassKind, SamplerRole};
use crate::uniforms::{InterfaceUniforms, MvpUniforms, PostUniforms, WarpUniforms};
use crate::warp::CornerOffsets;

/// Pass-specific uniform data uploaded as the material's `UBO` block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamBlock {
    None,
    Warp(WarpUniforms),
    Interface(InterfaceUniforms),
    Post(PostUniforms),
}

impl ParamBlock {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ParamBlock::None => None,
            ParamBlock::Warp(uniforms) => Some(bytemuck::bytes_of(uniforms)),
            ParamBlock::Interface(uniforms) => Some(bytemuck::bytes_of(uniforms)),
            ParamBlock::Post(uniforms) => Some(uniforms.as_bytes()),
        }
    }

    pub fn warp(&self) -> Option<&WarpUniforms> {
        match self {
            ParamBlock::Warp(uniforms) => Some(uniforms),
            _ => None,
        }
    }

    pub fn interface(&self) -> Option<&InterfaceUniforms> {
        match self {
            ParamBlock::Interface(uniforms) => Some(uniforms),
            _ => None,
        }
    }

    pub fn post(&self) -> Option<&PostUniforms> {
        match self {
            ParamBlock::Post(uniforms) => Some(uniforms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSlot {
    pub shader_name: &'static str,
    pub texture: TextureId,
}

/// One drawable pass: a shared material, its uniforms, its bound samplers and
/// the plane it draws.
///
/// A pass only exists fully resolved. Construction checks the material for
/// every uniform and sampler the pass kind uses and requires an initial
/// texture for each sampler slot.
#[derive(Debug)]
pub struct ShaderPass {
    kind: PassKind,
    material: Arc<Material>,
    blend: BlendMode,
    depth: DepthMode,
    mvp: MvpUniforms,
    params: ParamBlock,
    samplers: BTreeMap<SamplerRole, SamplerSlot>,
    mesh: PlaneMesh,
}

impl ShaderPass {
    pub fn new(
        kind: PassKind,
        material: Option<Arc<Material>>,
        bindings: &[(SamplerRole, TextureId)],
    ) -> Result<Self, PassError> {
        let material = material.ok_or_else(|| PassError::MissingMaterial {
            pass: kind,
            material: stock_material_name(kind),
        })?;
        let layout = material.layout();

        let mvp_block =
            layout
                .block(names::MVP_BLOCK)
                .ok_or_else(|| PassError::MissingUniformBlock {
                    pass: kind,
                    material: material.name().to_string(),
                    block: names::MVP_BLOCK.to_string(),
                })?;
        for uniform in [
            names::MODEL_MATRIX,
            names::VIEW_MATRIX,
            names::PROJECTION_MATRIX,
        ] {
            if mvp_block.member(uniform).is_none() {
                return Err(PassError::MissingUniform {
                    pass: kind,
                    material: material.name().to_string(),
                    block: names::MVP_BLOCK.to_string(),
                    uniform: uniform.to_string(),
                });
            }
        }

        let params = match kind.required_params() {
            None => ParamBlock::None,
            Some(required) => {
                let block = layout.block(names::PARAM_BLOCK).ok_or_else(|| {
                    PassError::MissingUniformBlock {
                        pass: kind,
                        material: material.name().to_string(),
                        block: names::PARAM_BLOCK.to_string(),
                    }
                })?;
                if let Some(missing) = required.iter().find(|name| block.member(name).is_none()) {
                    return Err(PassError::MissingUniform {
                        pass: kind,
                        material: material.name().to_string(),
                        block: names::PARAM_BLOCK.to_string(),
                        uniform: missing.to_string(),
                    });
                }
                match kind {
                    PassKind::Warp => ParamBlock::Warp(CornerOffsets::default().to_uniforms()),
                    PassKind::Interface => ParamBlock::Interface(InterfaceUniforms::default()),
                    PassKind::CustomPost => ParamBlock::Post(PostUniforms::from_layout(block)),
                    PassKind::Video | PassKind::Mask => ParamBlock::None,
                }
            }
        };

        let mut samplers = BTreeMap::new();
        for role in kind.sampler_roles() {
            if !layout.has_sampler(role.shader_name()) {
                return Err(PassError::MissingSampler {
                    pass: kind,
                    material: material.name().to_string(),
                    sampler: role.shader_name().to_string(),
                });
            }
            let texture = bindings
                .iter()
                .find(|(bound, _)| bound == role)
                .map(|(_, texture)| *texture)
                .ok_or_else(|| PassError::UnboundSampler {
                    pass: kind,
                    material: material.name().to_string(),
                    sampler: role.symbol().to_string(),
                })?;
            samplers.insert(
                *role,
                SamplerSlot {
                    shader_name: role.shader_name(),
                    texture,
                },
            );
        }

        debug!(pass = %kind, material = material.name(), "created shader pass");

        Ok(Self {
            kind,
            blend: kind.blend_mode(),
            depth: kind.depth_mode(),
            mvp: MvpUniforms::default(),
            params,
            samplers,
            mesh: PlaneMesh::for_pass(kind),
            material,
        })
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth
    }

    pub fn mesh(&self) -> PlaneMesh {
        self.mesh
    }

    pub fn mvp(&self) -> &MvpUniforms {
        &self.mvp
    }

    pub fn params(&self) -> &ParamBlock {
        &self.params
    }

    pub fn texture(&self, role: SamplerRole) -> Option<TextureId> {
        self.samplers.get(&role).map(|slot| slot.texture)
    }

    /// Points a sampler slot at a different texture.
    pub fn bind(&mut self, role: SamplerRole, texture: TextureId) {
        match self.samplers.get_mut(&role) {
            Some(slot) => slot.texture = texture,
            None => warn!(pass = %self.kind, sampler = %role, "pass has no such sampler slot"),
        }
    }

    pub fn set_matrices(&mut self, model: Mat4, view: Mat4, projection: Mat4) {
        self.mvp.set(model, view, projection);
    }

    pub fn set_corner_offsets(&mut self, offsets: &CornerOffsets) {
        if let ParamBlock::Warp(uniforms) = &mut self.params {
            *uniforms = offsets.to_uniforms();
        }
    }

    pub fn set_frame_thickness(&mut self, thickness: f32) {
        if let ParamBlock::Interface(uniforms) = &mut self.params {
            uniforms.frame_thickness = thickness;
        }
    }

    pub fn set_cursor_position(&mut self, position: Vec3) {
        if let ParamBlock::Interface(uniforms) = &mut self.params {
            uniforms.mouse_pos = position.to_array();
        }
    }

    pub fn set_time(&mut self, seconds: f32) {
        if let ParamBlock::Post(uniforms) = &mut self.params {
            uniforms.set_time(seconds);
        }
    }

    /// Draw description for rendering this pass into `target`.
    pub fn draw_call<'a>(&'a self, target: &'a RenderTarget) -> DrawCall<'a> {
        DrawCall {
            pass: self.kind,
            material: &self.material,
            blend: self.blend,
            depth: self.depth,
            target,
            mesh: self.mesh,
            mvp: bytemuck::bytes_of(&self.mvp),
            params: self.params.as_bytes(),
            samplers: self
                .samplers
                .values()
                .map(|slot| SamplerBinding {
                    name: slot.shader_name,
                    texture: slot.texture,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MaterialId, TargetId};
    use crate::material::{stock_layout, MaterialLayout};
    use glam::{UVec2, Vec2};

    fn material(kind: PassKind) -> Arc<Material> {
        Arc::new(Material::new(MaterialId(1), format!("stock-{kind}"), stock_layout(kind)))
    }

    fn target(id: u64) -> RenderTarget {
        RenderTarget {
            id: TargetId(id),
            color: TextureId(100 + id),
            size: UVec2::new(64, 32),
            clear_color: [0.0; 4],
        }
    }

    #[test]
    fn video_pass_binds_three_planes() {
        let pass = ShaderPass::new(
            PassKind::Video,
            Some(material(PassKind::Video)),
            &[
                (SamplerRole::Y, TextureId(1)),
                (SamplerRole::U, TextureId(2)),
                (SamplerRole::V, TextureId(3)),
            ],
        )
        .expect("video pass");
        assert_eq!(pass.blend_mode(), BlendMode::Opaque);
        assert_eq!(pass.mesh(), PlaneMesh::QUAD);
        assert_eq!(pass.params(), &ParamBlock::None);

        let target = target(1);
        let draw = pass.draw_call(&target);
        let names: Vec<_> = draw.samplers.iter().map(|binding| binding.name).collect();
        assert_eq!(names, vec!["yTexture", "uTexture", "vTexture"]);
        assert!(draw.params.is_none());
        assert_eq!(draw.mvp.len(), 192);
    }

    #[test]
    fn missing_material_is_reported() {
        let err = ShaderPass::new(PassKind::Warp, None, &[]).unwrap_err();
        assert_eq!(
            err,
            PassError::MissingMaterial {
                pass: PassKind::Warp,
                material: "stock-warp".into(),
            }
        );
    }

    #[test]
    fn missing_sampler_names_the_symbol() {
        let mut layout = stock_layout(PassKind::Mask);
        layout.samplers.retain(|name| name != "maskTexture");
        let material = Arc::new(Material::new(MaterialId(2), "bad-mask", layout));
        let err = ShaderPass::new(
            PassKind::Mask,
            Some(material),
            &[(SamplerRole::Input, TextureId(1)), (SamplerRole::Mask, TextureId(2))],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PassError::MissingSampler {
                pass: PassKind::Mask,
                material: "bad-mask".into(),
                sampler: "maskTexture".into(),
            }
        );
    }

    #[test]
    fn missing_param_uniform_fails_construction() {
        let mut layout = stock_layout(PassKind::Warp);
        layout.blocks[1].members.retain(|member| member.name != "bottomRight");
        let material = Arc::new(Material::new(MaterialId(3), "bad-warp", layout));
        let err = ShaderPass::new(PassKind::Warp, Some(material), &[(SamplerRole::Input, TextureId(1))])
            .unwrap_err();
        assert!(matches!(
            err,
            PassError::MissingUniform { ref uniform, .. } if uniform == "bottomRight"
        ));
    }

    #[test]
    fn missing_mvp_block_fails_construction() {
        let material = Arc::new(Material::new(
            MaterialId(4),
            "empty",
            MaterialLayout {
                blocks: Vec::new(),
                samplers: vec!["inTexture".into()],
            },
        ));
        let err = ShaderPass::new(
            PassKind::Interface,
            Some(material),
            &[(SamplerRole::Input, TextureId(1))],
        )
        .unwrap_err();
        assert!(matches!(err, PassError::MissingUniformBlock { ref block, .. } if block == "mvp"));
    }

    #[test]
    fn missing_view_matrix_fails_construction() {
        let mut layout = stock_layout(PassKind::Video);
        layout.blocks[0].members.retain(|member| member.name != "viewMatrix");
        let material = Arc::new(Material::new(MaterialId(5), "no-view", layout));
        let err = ShaderPass::new(
            PassKind::Video,
            Some(material),
            &[
                (SamplerRole::Y, TextureId(1)),
                (SamplerRole::U, TextureId(2)),
                (SamplerRole::V, TextureId(3)),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PassError::MissingUniform {
                pass: PassKind::Video,
                material: "no-view".into(),
                block: "mvp".into(),
                uniform: "viewMatrix".into(),
            }
        );
    }

    #[test]
    fn unbound_sampler_fails_construction() {
        let err = ShaderPass::new(PassKind::Interface, Some(material(PassKind::Interface)), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            PassError::UnboundSampler { ref sampler, .. } if sampler == "inTextureSampler"
        ));
    }

    #[test]
    fn parameter_setters_only_touch_their_pass() {
        let mut interface = ShaderPass::new(
            PassKind::Interface,
            Some(material(PassKind::Interface)),
            &[(SamplerRole::Input, TextureId(1))],
        )
        .unwrap();
        interface.set_frame_thickness(0.05);
        interface.set_cursor_position(Vec3::new(0.5, 0.25, 0.0));
        interface.set_corner_offsets(&CornerOffsets::uniform(Vec2::ONE));
        let uniforms = interface.params().interface().unwrap();
        assert_eq!(uniforms.frame_thickness, 0.05);
        assert_eq!(uniforms.mouse_pos, [0.5, 0.25, 0.0]);
    }

    #[test]
    fn rebinding_changes_draw_inputs() {
        let mut warp = ShaderPass::new(
            PassKind::Warp,
            Some(material(PassKind::Warp)),
            &[(SamplerRole::Input, TextureId(1))],
        )
        .unwrap();
        warp.bind(SamplerRole::Input, TextureId(7));
        warp.bind(SamplerRole::Mask, TextureId(8));
        assert_eq!(warp.texture(SamplerRole::Input), Some(TextureId(7)));
        assert_eq!(warp.texture(SamplerRole::Mask), None);

        let target = target(2);
        let draw = warp.draw_call(&target);
        assert_eq!(draw.mesh, PlaneMesh::WARP_GRID);
        assert_eq!(draw.params.map(<[u8]>::len), Some(64));
        assert!(!draw.reads_target());
    }
}
