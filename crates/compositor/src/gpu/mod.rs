//! Headless wgpu backend.
//!
//! - `context` brings up an adapter, device and queue without a surface.
//! - `shaders` holds the WGSL of the stock materials.
//! - `pipeline` turns a reflected material into bind group layouts and
//!   lazily built pipelines, one per blend mode.
//! - `targets` creates sampled and render textures and reads targets back.
//!
//! Draws are encoded into one command encoder per recording scope and
//! submitted when the scope ends, so program order is execution order.

mod context;
mod pipeline;
mod shaders;
mod targets;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, error, warn};
use wgpu::util::DeviceExt;

use crate::backend::{
    DrawCall, MaterialId, RecordingScope, RenderBackend, RenderTarget, RenderTargetDesc,
    TargetId, TextureDesc, TextureId,
};
use crate::material::{stock_material_name, Material};
use crate::mesh::PlaneMesh;
use crate::reflect::{parse_wgsl, reflect_module};
use crate::types::PassKind;

use context::GpuContext;
use pipeline::MaterialPipelines;
use targets::GpuTexture;

pub use shaders::{stock_source, PASSTHROUGH_POST};

/// Adapter selection knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuOptions {
    pub high_performance: bool,
    pub force_fallback_adapter: bool,
}

struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct OpenScope {
    scope: RecordingScope,
    encoder: wgpu::CommandEncoder,
}

pub struct GpuBackend {
    context: GpuContext,
    next_id: u64,
    sampler: wgpu::Sampler,
    textures: HashMap<TextureId, GpuTexture>,
    targets: HashMap<TargetId, TextureId>,
    materials: HashMap<MaterialId, MaterialPipelines>,
    stock: BTreeMap<PassKind, Arc<Material>>,
    meshes: HashMap<PlaneMesh, MeshBuffers>,
    open: Option<OpenScope>,
}

impl GpuBackend {
    pub fn new(options: GpuOptions) -> Result<Self> {
        let context = GpuContext::new(&options)?;
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("canvas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            context,
            next_id: 0,
            sampler,
            textures: HashMap::new(),
            targets: HashMap::new(),
            materials: HashMap::new(),
            stock: BTreeMap::new(),
            meshes: HashMap::new(),
            open: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_info.name
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn compile_material(&mut self, name: &str, source: &str) -> Result<Arc<Material>> {
        let module = parse_wgsl(source).with_context(|| format!("material '{name}'"))?;
        let layout = reflect_module(&module).with_context(|| format!("material '{name}'"))?;
        let id = MaterialId(self.allocate());
        let pipelines = MaterialPipelines::new(&self.context.device, name, source, &layout);
        self.materials.insert(id, pipelines);
        debug!(material = name, samplers = ?layout.samplers, "compiled material");
        Ok(Arc::new(Material::new(id, name, layout)))
    }

    fn check_size(&self, label: &str, size: glam::UVec2) -> Result<()> {
        let max = self.context.max_texture_dimension;
        if size.x == 0 || size.y == 0 || size.x > max || size.y > max {
            bail!(
                "'{label}' is {}x{}; textures must be between 1 and {max} pixels per side",
                size.x,
                size.y
            );
        }
        Ok(())
    }

    /// Reads a render target back as an RGBA image.
    pub fn read_target_rgba8(&mut self, target: &RenderTarget) -> Result<image::RgbaImage> {
        if self.open.is_some() {
            bail!("cannot read back a target while a recording scope is open");
        }
        let texture = self
            .targets
            .get(&target.id)
            .and_then(|color| self.textures.get(color))
            .ok_or_else(|| anyhow!("unknown render target {:?}", target.id))?;
        targets::read_rgba8(&self.context.device, &self.context.queue, texture)
    }

    /// Writes a render target to a PNG file.
    pub fn export_png(&mut self, target: &RenderTarget, path: &Path) -> Result<()> {
        let image = self.read_target_rgba8(target)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "exported render target");
        Ok(())
    }

    fn mesh_buffers(&mut self, mesh: PlaneMesh) -> &MeshBuffers {
        let device = &self.context.device;
        self.meshes.entry(mesh).or_insert_with(|| {
            let vertices = mesh.vertices();
            let indices = mesh.indices();
            MeshBuffers {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("plane vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("plane indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: indices.len() as u32,
            }
        })
    }

    fn encode_draw(&mut self, draw: &DrawCall<'_>) -> Result<()> {
        self.mesh_buffers(draw.mesh);

        let device = &self.context.device;
        let material = self
            .materials
            .get_mut(&draw.material.id())
            .ok_or_else(|| anyhow!("material '{}' was not compiled here", draw.material.name()))?;
        material.pipeline(device, draw.blend);
        let material = &self.materials[&draw.material.id()];

        let mvp = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mvp uniforms"),
            contents: draw.mvp,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let params = material.param_size.map(|size| {
            let mut contents = vec![0u8; size as usize];
            if let Some(bytes) = draw.params {
                let len = bytes.len().min(contents.len());
                contents[..len].copy_from_slice(&bytes[..len]);
            }
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("param uniforms"),
                contents: &contents,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let mut uniform_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: mvp.as_entire_binding(),
        }];
        if let Some(params) = &params {
            uniform_entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: params.as_entire_binding(),
            });
        }
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &material.uniform_layout,
            entries: &uniform_entries,
        });

        let mut texture_entries = Vec::with_capacity(material.samplers.len() * 2);
        for (index, name) in material.samplers.iter().enumerate() {
            let texture = draw
                .samplers
                .iter()
                .find(|binding| binding.name == name.as_str())
                .and_then(|binding| self.textures.get(&binding.texture))
                .ok_or_else(|| anyhow!("{} pass: no texture for sampler '{name}'", draw.pass))?;
            texture_entries.push(wgpu::BindGroupEntry {
                binding: index as u32 * 2,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            texture_entries.push(wgpu::BindGroupEntry {
                binding: index as u32 * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        let texture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture bind group"),
            layout: &material.texture_layout,
            entries: &texture_entries,
        });

        let attachment = self
            .textures
            .get(&draw.target.color)
            .ok_or_else(|| anyhow!("unknown render target {:?}", draw.target.id))?;
        let pipeline = material
            .pipeline_ref(draw.blend)
            .ok_or_else(|| anyhow!("pipeline for '{}' missing", draw.material.name()))?;
        let mesh = &self.meshes[&draw.mesh];
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| anyhow!("draw submitted outside a recording scope"))?;

        let load = match open.scope {
            RecordingScope::Headless => wgpu::LoadOp::Clear(clear_color(draw.target.clear_color)),
            RecordingScope::Surface(_) => wgpu::LoadOp::Load,
        };
        let mut render_pass = open.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(draw.pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &attachment.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &uniform_group, &[]);
        render_pass.set_bind_group(1, &texture_group, &[]);
        render_pass.set_vertex_buffer(0, mesh.vertices.slice(..));
        render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        Ok(())
    }
}

fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color[0]),
        g: f64::from(color[1]),
        b: f64::from(color[2]),
        a: f64::from(color[3]),
    }
}

impl RenderBackend for GpuBackend {
    fn stock_material(&mut self, kind: PassKind) -> Option<Arc<Material>> {
        if let Some(material) = self.stock.get(&kind) {
            return Some(Arc::clone(material));
        }
        match self.compile_material(&stock_material_name(kind), &stock_source(kind)) {
            Ok(material) => {
                self.stock.insert(kind, Arc::clone(&material));
                Some(material)
            }
            Err(err) => {
                error!(pass = %kind, error = %format!("{err:#}"), "failed to compile stock material");
                None
            }
        }
    }

    fn load_material(&mut self, name: &str, source: &str) -> Result<Arc<Material>> {
        self.compile_material(name, source)
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId> {
        self.check_size(&desc.label, desc.size)?;
        let texture = targets::create_sampled_texture(
            &self.context.device,
            &self.context.queue,
            &desc.label,
            desc.size,
            desc.format,
            pixels,
        )?;
        let id = TextureId(self.allocate());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<()> {
        let target = self
            .textures
            .get(&texture)
            .ok_or_else(|| anyhow!("unknown texture {texture:?}"))?;
        targets::write_sampled_texture(&self.context.queue, target, pixels)
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTarget> {
        self.check_size(&desc.label, desc.size)?;
        let texture = targets::create_render_texture(&self.context.device, &desc.label, desc.size);
        let id = TargetId(self.allocate());
        let color = TextureId(self.allocate());
        self.textures.insert(color, texture);
        self.targets.insert(id, color);
        debug!(label = %desc.label, width = desc.size.x, height = desc.size.y, "created render target");
        Ok(RenderTarget {
            id,
            color,
            size: desc.size,
            clear_color: desc.clear_color,
        })
    }

    fn release_render_target(&mut self, target: &RenderTarget) {
        if self.targets.remove(&target.id).is_none() {
            warn!(target = ?target.id, "released an unknown render target");
            return;
        }
        self.textures.remove(&target.color);
        debug!(target = ?target.id, "released render target");
    }

    fn begin_recording(&mut self, scope: RecordingScope) -> bool {
        if self.open.is_some() {
            warn!(?scope, "recording scope already open");
            return false;
        }
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("canvas encoder"),
                });

        if let RecordingScope::Surface(surface) = &scope {
            let Some(texture) = self.textures.get(&surface.color) else {
                warn!(target = ?surface.id, "surface is not a render target of this backend");
                return false;
            };
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("surface clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &texture.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(surface.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }

        self.open = Some(OpenScope { scope, encoder });
        true
    }

    fn submit(&mut self, draw: &DrawCall<'_>) {
        if let Err(err) = self.encode_draw(draw) {
            error!(pass = %draw.pass, error = %format!("{err:#}"), "dropped draw");
        }
    }

    fn end_recording(&mut self) {
        match self.open.take() {
            Some(open) => {
                self.context.queue.submit(Some(open.encoder.finish()));
            }
            None => warn!("end_recording without an open scope"),
        }
    }
}
