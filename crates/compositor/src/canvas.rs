use std::sync::Arc;

use crossbeam_channel::Receiver;
use glam::{UVec2, Vec3};
use tracing::{debug, warn};

use crate::backend::{RenderBackend, RenderTarget, TextureId};
use crate::compositor::{CanvasCompositor, CompositorSetup};
use crate::error::CanvasError;
use crate::material::Material;
use crate::presentation::Presentation;
use crate::runtime::BoxedTimeSource;
use crate::types::{CanvasTransform, OUTPUT_CLEAR_COLOR};
use crate::video::{ClipChanged, VideoSource};
use crate::warp::CornerOffsets;

/// Configuration of one canvas.
///
/// Optional fields enable optional stages: a mask texture adds the mask pass
/// and a post material adds the custom post pass.
#[derive(Debug, Clone)]
pub struct CanvasDescriptor {
    pub name: String,
    /// Output height in pixels; the source height when unset.
    pub resolution: Option<u32>,
    /// Output width over height; the source aspect ratio when unset.
    pub aspect_ratio: Option<f32>,
    pub mask: Option<TextureId>,
    pub post_material: Option<Arc<Material>>,
    pub corner_offsets: CornerOffsets,
    pub transform: CanvasTransform,
    pub clear_color: [f32; 4],
}

impl CanvasDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: None,
            aspect_ratio: None,
            mask: None,
            post_material: None,
            corner_offsets: CornerOffsets::default(),
            transform: CanvasTransform::default(),
            clear_color: OUTPUT_CLEAR_COLOR,
        }
    }
}

/// Size of a canvas output target.
///
/// With a resolution the height is fixed and the width follows the
/// configured aspect ratio, falling back to the source's. Without one the
/// source dimensions are used as-is.
pub fn resolve_output_size(
    resolution: Option<u32>,
    aspect_ratio: Option<f32>,
    source: UVec2,
) -> UVec2 {
    let source = source.max(UVec2::ONE);
    match resolution.filter(|height| *height > 0) {
        Some(height) => {
            let aspect = aspect_ratio
                .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
                .unwrap_or(source.x as f32 / source.y as f32);
            let width = (height as f32 * aspect).round().max(1.0) as u32;
            UVec2::new(width, height)
        }
        None => source,
    }
}

/// One wall tile: a video source, its pass chain and its placement.
pub struct Canvas {
    name: String,
    transform: CanvasTransform,
    source: Box<dyn VideoSource>,
    changes: Receiver<ClipChanged>,
    source_size: UVec2,
    compositor: CanvasCompositor,
}

impl Canvas {
    pub fn new(
        backend: &mut dyn RenderBackend,
        descriptor: CanvasDescriptor,
        source: Box<dyn VideoSource>,
        time: BoxedTimeSource,
    ) -> Result<Self, CanvasError> {
        let source_size = source.size();
        let output_size =
            resolve_output_size(descriptor.resolution, descriptor.aspect_ratio, source_size);
        debug!(
            canvas = %descriptor.name,
            source = ?source_size,
            output = ?output_size,
            "sizing canvas output"
        );

        let compositor = CanvasCompositor::new(
            backend,
            CompositorSetup {
                label: descriptor.name.clone(),
                output_size,
                clear_color: descriptor.clear_color,
                planes: source.planes(),
                mask: descriptor.mask,
                post_material: descriptor.post_material,
                corner_offsets: descriptor.corner_offsets,
            },
            time,
        )?;

        Ok(Self {
            name: descriptor.name,
            transform: descriptor.transform,
            changes: source.clip_changes(),
            source,
            source_size,
            compositor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &RenderTarget {
        self.compositor.output()
    }

    pub fn compositor(&self) -> &CanvasCompositor {
        &self.compositor
    }

    pub fn transform(&self) -> CanvasTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: CanvasTransform) {
        self.transform = transform;
    }

    pub fn corner_offsets(&self) -> CornerOffsets {
        self.compositor.corner_offsets()
    }

    pub fn set_corner_offsets(&mut self, offsets: CornerOffsets) {
        self.compositor.set_corner_offsets(offsets);
    }

    pub fn set_frame_thickness(&mut self, thickness: f32) {
        self.compositor.set_frame_thickness(thickness);
    }

    pub fn set_cursor_position(&mut self, position: Vec3) {
        self.compositor.set_cursor_position(position);
    }

    /// Applies pending clip changes; returns whether the planes were re-bound.
    pub fn poll_source(&mut self) -> bool {
        let Some(change) = self.changes.try_iter().last() else {
            return false;
        };
        self.compositor.rebind_planes(self.source.planes());
        if change.size != self.source_size {
            warn!(
                canvas = %self.name,
                previous = ?self.source_size,
                current = ?change.size,
                "source size changed; output target keeps its original size"
            );
            self.source_size = change.size;
        }
        debug!(canvas = %self.name, "re-bound video planes after clip change");
        true
    }

    /// Picks up clip changes, then runs the headless chain.
    pub fn draw_all_headless_passes(&mut self, backend: &mut dyn RenderBackend) {
        self.poll_source();
        self.compositor.draw_all_headless_passes(backend);
    }

    pub fn draw_interface(&mut self, backend: &mut dyn RenderBackend, target: &RenderTarget) {
        self.compositor.draw_interface(backend, target);
    }

    pub fn set_final_sampler(&mut self, is_interface: bool) {
        self.compositor.set_final_sampler(is_interface);
    }

    pub fn clear_interface_output(&mut self) {
        self.compositor.clear_interface_output();
    }

    pub fn on_draw(
        &mut self,
        backend: &mut dyn RenderBackend,
        surface: &RenderTarget,
        presentation: &Presentation,
    ) {
        let transform = self.transform;
        self.compositor
            .on_draw(backend, surface, presentation, &transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_keeps_source_aspect() {
        let size = resolve_output_size(Some(480), None, UVec2::new(640, 480));
        assert_eq!(size, UVec2::new(640, 480));
        let size = resolve_output_size(Some(720), None, UVec2::new(640, 480));
        assert_eq!(size, UVec2::new(960, 720));
    }

    #[test]
    fn configured_aspect_overrides_source() {
        let size = resolve_output_size(Some(100), Some(2.0), UVec2::new(640, 480));
        assert_eq!(size, UVec2::new(200, 100));
    }

    #[test]
    fn missing_resolution_uses_source_size() {
        let size = resolve_output_size(None, Some(2.0), UVec2::new(1920, 1080));
        assert_eq!(size, UVec2::new(1920, 1080));
    }

    #[test]
    fn degenerate_inputs_clamp_to_one() {
        assert_eq!(resolve_output_size(None, None, UVec2::ZERO), UVec2::ONE);
        assert_eq!(resolve_output_size(Some(0), None, UVec2::new(0, 0)), UVec2::ONE);
        let size = resolve_output_size(Some(10), Some(f32::NAN), UVec2::new(0, 5));
        assert_eq!(size, UVec2::new(2, 10));
    }
}
