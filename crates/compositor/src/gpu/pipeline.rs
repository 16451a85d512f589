use std::borrow::Cow;
use std::collections::HashMap;

use crate::material::{names, MaterialLayout};
use crate::mesh::PlaneVertex;
use crate::reflect::{FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::types::BlendMode;

pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

/// Compiled shader module, bind group layouts and per-blend pipelines of one
/// material.
pub(crate) struct MaterialPipelines {
    label: String,
    module: wgpu::ShaderModule,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<BlendMode, wgpu::RenderPipeline>,
    /// Size of the `UBO` block, when the material declares one.
    pub param_size: Option<u64>,
    pub samplers: Vec<String>,
}

impl MaterialPipelines {
    pub fn new(device: &wgpu::Device, label: &str, source: &str, layout: &MaterialLayout) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
        });

        let param_size = layout
            .block(names::PARAM_BLOCK)
            .map(|block| u64::from(block.size.max(4)).next_multiple_of(16));

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material uniform layout"),
            entries: &build_uniform_layout_entries(param_size.is_some()),
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material texture layout"),
            entries: &build_texture_layout_entries(layout.samplers.len()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("material pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        Self {
            label: label.to_string(),
            module,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            param_size,
            samplers: layout.samplers.clone(),
        }
    }

    /// Pipeline for `blend`, built on first use.
    pub fn pipeline(&mut self, device: &wgpu::Device, blend: BlendMode) -> &wgpu::RenderPipeline {
        self.pipelines.entry(blend).or_insert_with(|| {
            tracing::debug!(material = %self.label, ?blend, "building render pipeline");
            create_pipeline(device, &self.label, &self.module, &self.pipeline_layout, blend)
        })
    }

    pub fn pipeline_ref(&self, blend: BlendMode) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&blend)
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    blend: BlendMode,
) -> wgpu::RenderPipeline {
    let blend_state = match blend {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(VERTEX_ENTRY),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<PlaneVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(blend_state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn build_uniform_layout_entries(has_params: bool) -> Vec<wgpu::BindGroupLayoutEntry> {
    let count = if has_params { 2 } else { 1 };
    (0..count)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect()
}

fn build_texture_layout_entries(samplers: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(samplers * 2);
    for index in 0..samplers as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}
