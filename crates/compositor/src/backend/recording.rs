use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{bail, Result};
use glam::Mat4;
use tracing::warn;

use super::{
    DrawCall, MaterialId, RecordingScope, RenderBackend, RenderTarget, RenderTargetDesc,
    TargetId, TextureDesc, TextureId,
};
use crate::material::{stock_layout, stock_material_name, Material, MaterialLayout};
use crate::mesh::PlaneMesh;
use crate::reflect::reflect_wgsl;
use crate::types::{BlendMode, PassKind};
use crate::uniforms::MvpUniforms;

/// A draw as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub pass: PassKind,
    pub material: String,
    pub blend: BlendMode,
    pub target: TargetId,
    pub target_texture: TextureId,
    pub samplers: Vec<(&'static str, TextureId)>,
    pub mesh: PlaneMesh,
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub params: Option<Vec<u8>>,
    /// Scope the draw was submitted in, `None` when no scope was open.
    pub scope: Option<RecordingScope>,
}

impl DrawRecord {
    pub fn sampled(&self, name: &str) -> Option<TextureId> {
        self.samplers
            .iter()
            .find(|(sampler, _)| *sampler == name)
            .map(|(_, texture)| *texture)
    }

    pub fn reads_target(&self) -> bool {
        self.samplers
            .iter()
            .any(|(_, texture)| *texture == self.target_texture)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Begin(RecordingScope),
    Draw(DrawRecord),
    End,
}

/// Backend that executes nothing and remembers everything.
///
/// Resource ids are allocated from counters, so runs are deterministic.
/// Stock material layouts can be overridden or withheld per pass kind.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    layouts: BTreeMap<PassKind, Option<MaterialLayout>>,
    stock: BTreeMap<PassKind, Arc<Material>>,
    textures: HashMap<TextureId, TextureDesc>,
    targets: HashMap<TargetId, RenderTargetDesc>,
    open_scope: Option<RecordingScope>,
    events: Vec<RecordedEvent>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `layout` instead of the stock layout for `kind`.
    pub fn with_stock_layout(mut self, kind: PassKind, layout: MaterialLayout) -> Self {
        self.layouts.insert(kind, Some(layout));
        self
    }

    /// Reports no stock material for `kind`.
    pub fn without_stock_material(mut self, kind: PassKind) -> Self {
        self.layouts.insert(kind, None);
        self
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Registers a material with an explicit layout.
    pub fn material(&mut self, name: &str, layout: MaterialLayout) -> Arc<Material> {
        let id = MaterialId(self.allocate());
        Arc::new(Material::new(id, name, layout))
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.events.iter().filter_map(|event| match event {
            RecordedEvent::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn texture_label(&self, texture: TextureId) -> Option<&str> {
        self.textures.get(&texture).map(|desc| desc.label.as_str())
    }

    pub fn target_label(&self, target: TargetId) -> Option<&str> {
        self.targets.get(&target).map(|desc| desc.label.as_str())
    }

    /// Render targets created and not yet released.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl RenderBackend for RecordingBackend {
    fn stock_material(&mut self, kind: PassKind) -> Option<Arc<Material>> {
        if let Some(material) = self.stock.get(&kind) {
            return Some(Arc::clone(material));
        }
        let layout = match self.layouts.get(&kind) {
            Some(Some(layout)) => layout.clone(),
            Some(None) => return None,
            None => stock_layout(kind),
        };
        let material = self.material(&stock_material_name(kind), layout);
        self.stock.insert(kind, Arc::clone(&material));
        Some(material)
    }

    fn load_material(&mut self, name: &str, source: &str) -> Result<Arc<Material>> {
        let layout = reflect_wgsl(source)?;
        Ok(self.material(name, layout))
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId> {
        let expected = desc.format.byte_len(desc.size);
        if pixels.len() != expected {
            bail!(
                "texture '{}' expects {expected} bytes, got {}",
                desc.label,
                pixels.len()
            );
        }
        let id = TextureId(self.allocate());
        self.textures.insert(id, desc.clone());
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<()> {
        let Some(desc) = self.textures.get(&texture) else {
            bail!("unknown texture {texture:?}");
        };
        let expected = desc.format.byte_len(desc.size);
        if pixels.len() != expected {
            bail!(
                "texture '{}' expects {expected} bytes, got {}",
                desc.label,
                pixels.len()
            );
        }
        Ok(())
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTarget> {
        let id = TargetId(self.allocate());
        let color = TextureId(self.allocate());
        self.textures.insert(
            color,
            TextureDesc {
                label: desc.label.clone(),
                size: desc.size,
                format: super::TextureFormat::Rgba8,
            },
        );
        self.targets.insert(id, desc.clone());
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
        }
        self.textures.remove(&target.color);
    }

    fn begin_recording(&mut self, scope: RecordingScope) -> bool {
        if self.open_scope.is_some() {
            warn!(?scope, "recording scope already open");
            return false;
        }
        self.open_scope = Some(scope.clone());
        self.events.push(RecordedEvent::Begin(scope));
        true
    }

    fn submit(&mut self, draw: &DrawCall<'_>) {
        if self.open_scope.is_none() {
            warn!(pass = %draw.pass, "draw submitted outside a recording scope");
        }
        let mvp: MvpUniforms = bytemuck::pod_read_unaligned(draw.mvp);
        self.events.push(RecordedEvent::Draw(DrawRecord {
            pass: draw.pass,
            material: draw.material.name().to_string(),
            blend: draw.blend,
            target: draw.target.id,
            target_texture: draw.target.color,
            samplers: draw
                .samplers
                .iter()
                .map(|binding| (binding.name, binding.texture))
                .collect(),
            mesh: draw.mesh,
            model: mvp.model(),
            view: mvp.view(),
            projection: mvp.projection(),
            params: draw.params.map(<[u8]>::to_vec),
            scope: self.open_scope.clone(),
        }));
    }

    fn end_recording(&mut self) {
        if self.open_scope.take().is_none() {
            warn!("end_recording without an open scope");
            return;
        }
        self.events.push(RecordedEvent::End);
    }
}
