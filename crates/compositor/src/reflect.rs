//! WGSL reflection into a [`MaterialLayout`].
//!
//! Materials follow a fixed binding convention so every backend can bind
//! them without per-shader metadata:
//! - group 0, binding 0: the `mvp` uniform block
//! - group 0, binding 1: the optional `UBO` parameter block
//! - group 1, bindings `2i` / `2i + 1`: sampled texture `i` and its sampler
//!
//! Vertex and fragment entry points are named `vs_main` and `fs_main`.

use anyhow::{anyhow, bail, Result};

use crate::material::{
    names, MaterialLayout, UniformBlockLayout, UniformKind, UniformMember,
};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub const UNIFORM_GROUP: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;

/// Parses and validates WGSL.
pub(crate) fn parse_wgsl(source: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| anyhow!("failed to parse WGSL: {}", err.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|err| anyhow!("invalid WGSL: {}", err.emit_to_string(source)))?;
    Ok(module)
}

/// Reflects the uniform blocks and sampled textures of a WGSL material.
pub fn reflect_wgsl(source: &str) -> Result<MaterialLayout> {
    let module = parse_wgsl(source)?;
    reflect_module(&module)
}

pub(crate) fn reflect_module(module: &naga::Module) -> Result<MaterialLayout> {
    for (entry, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        if !module
            .entry_points
            .iter()
            .any(|point| point.name == entry && point.stage == stage)
        {
            bail!("material is missing the {stage:?} entry point '{entry}'");
        }
    }

    let mut blocks = Vec::new();
    let mut textures = Vec::new();
    for (_, variable) in module.global_variables.iter() {
        let (Some(name), Some(binding)) = (variable.name.as_deref(), variable.binding.as_ref())
        else {
            continue;
        };
        match variable.space {
            naga::AddressSpace::Uniform => {
                let expected = match name {
                    names::MVP_BLOCK => 0,
                    names::PARAM_BLOCK => 1,
                    other => bail!("unsupported uniform block '{other}'"),
                };
                if binding.group != UNIFORM_GROUP || binding.binding != expected {
                    bail!(
                        "uniform block '{name}' must be bound at group {UNIFORM_GROUP}, binding {expected}"
                    );
                }
                blocks.push(block_layout(module, name, variable.ty)?);
            }
            naga::AddressSpace::Handle => {
                if let naga::TypeInner::Image { .. } = module.types[variable.ty].inner {
                    if binding.group != TEXTURE_GROUP {
                        bail!("texture '{name}' must live in bind group {TEXTURE_GROUP}");
                    }
                    textures.push((binding.binding, name.to_string()));
                }
            }
            _ => {}
        }
    }

    textures.sort_by_key(|(binding, _)| *binding);
    for (index, (binding, name)) in textures.iter().enumerate() {
        if *binding != index as u32 * 2 {
            bail!(
                "texture '{name}' is bound at {binding}; expected binding {}",
                index * 2
            );
        }
    }

    Ok(MaterialLayout {
        blocks,
        samplers: textures.into_iter().map(|(_, name)| name).collect(),
    })
}

fn block_layout(
    module: &naga::Module,
    name: &str,
    ty: naga::Handle<naga::Type>,
) -> Result<UniformBlockLayout> {
    let naga::TypeInner::Struct { members, span } = &module.types[ty].inner else {
        bail!("uniform block '{name}' must be a struct");
    };
    Ok(UniformBlockLayout {
        name: name.to_string(),
        size: *span,
        members: members
            .iter()
            .map(|member| UniformMember {
                name: member.name.clone().unwrap_or_default(),
                offset: member.offset,
                kind: uniform_kind(&module.types[member.ty].inner),
            })
            .collect(),
    })
}

fn uniform_kind(inner: &naga::TypeInner) -> UniformKind {
    match *inner {
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => UniformKind::Float,
        naga::TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => match size {
            naga::VectorSize::Bi => UniformKind::Vec2,
            naga::VectorSize::Tri => UniformKind::Vec3,
            naga::VectorSize::Quad => UniformKind::Vec4,
        },
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            scalar,
        } if scalar == naga::Scalar::F32 => UniformKind::Mat4,
        _ => UniformKind::Other,
    }
}
