//! All canvases of a wall, driven through one frame at a time.

use anyhow::Result;
use glam::Vec3;
use tracing::debug;

use crate::backend::{RecordingScope, RenderBackend, RenderTarget, RenderTargetDesc};
use crate::canvas::Canvas;
use crate::presentation::Presentation;
use crate::types::OUTPUT_CLEAR_COLOR;

/// A surface to present into and how to present into it.
#[derive(Debug, Clone)]
pub struct SurfacePass {
    pub target: RenderTarget,
    pub presentation: Presentation,
}

/// Owns the canvases of a wall and the interface preview target.
///
/// A frame is one headless scope in which every canvas composites and the
/// selected canvas renders its interface overlay, followed by one scope per
/// presented surface.
#[derive(Default)]
pub struct CanvasGroup {
    canvases: Vec<Canvas>,
    selected: Option<usize>,
    preview: Option<RenderTarget>,
}

impl CanvasGroup {
    pub fn new(canvases: Vec<Canvas>) -> Self {
        Self {
            canvases,
            selected: None,
            preview: None,
        }
    }

    pub fn push(&mut self, canvas: Canvas) {
        self.canvases.push(canvas);
    }

    pub fn canvases(&self) -> &[Canvas] {
        &self.canvases
    }

    pub fn canvas(&self, name: &str) -> Option<&Canvas> {
        self.canvases.iter().find(|canvas| canvas.name() == name)
    }

    pub fn canvas_mut(&mut self, name: &str) -> Option<&mut Canvas> {
        self.canvases.iter_mut().find(|canvas| canvas.name() == name)
    }

    pub fn selected(&self) -> Option<&Canvas> {
        self.selected.and_then(|index| self.canvases.get(index))
    }

    /// Target holding the selected canvas's interface overlay.
    pub fn preview_target(&self) -> Option<&RenderTarget> {
        self.preview.as_ref()
    }

    /// Selects the canvas whose interface overlay is rendered, creating a
    /// preview target sized like its output. A preview of another size is
    /// released. Returns `false` for unknown names.
    pub fn select(&mut self, backend: &mut dyn RenderBackend, name: &str) -> Result<bool> {
        let Some(index) = self.canvases.iter().position(|canvas| canvas.name() == name) else {
            return Ok(false);
        };
        let size = self.canvases[index].output().size;
        if self.preview.as_ref().map(|preview| preview.size) != Some(size) {
            let preview = backend.create_render_target(&RenderTargetDesc {
                label: "interface preview".to_string(),
                size,
                clear_color: OUTPUT_CLEAR_COLOR,
            })?;
            if let Some(stale) = self.preview.replace(preview) {
                for canvas in &mut self.canvases {
                    canvas.clear_interface_output();
                }
                backend.release_render_target(&stale);
            }
        }
        if let Some(previous) = self.selected.replace(index) {
            if previous != index {
                self.canvases[previous].set_final_sampler(false);
            }
        }
        debug!(canvas = name, "selected canvas");
        Ok(true)
    }

    pub fn clear_selection(&mut self) {
        if let Some(previous) = self.selected.take() {
            self.canvases[previous].set_final_sampler(false);
        }
    }

    pub fn set_frame_thickness(&mut self, thickness: f32) {
        if let Some(canvas) = self.selected.and_then(|index| self.canvases.get_mut(index)) {
            canvas.set_frame_thickness(thickness);
        }
    }

    pub fn set_cursor_position(&mut self, position: Vec3) {
        if let Some(canvas) = self.selected.and_then(|index| self.canvases.get_mut(index)) {
            canvas.set_cursor_position(position);
        }
    }

    /// Composites every canvas and the selected interface overlay.
    pub fn draw_headless(&mut self, backend: &mut dyn RenderBackend) {
        if !backend.begin_recording(RecordingScope::Headless) {
            return;
        }
        for canvas in &mut self.canvases {
            canvas.draw_all_headless_passes(backend);
        }
        if let (Some(index), Some(preview)) = (self.selected, self.preview.as_ref()) {
            self.canvases[index].draw_interface(backend, preview);
        }
        backend.end_recording();
    }

    /// Presents every canvas into one surface.
    pub fn present(&mut self, backend: &mut dyn RenderBackend, surface: &SurfacePass) {
        if !backend.begin_recording(RecordingScope::Surface(surface.target.clone())) {
            return;
        }
        for (index, canvas) in self.canvases.iter_mut().enumerate() {
            let is_interface = surface.presentation.show_interface && self.selected == Some(index);
            canvas.set_final_sampler(is_interface);
            canvas.on_draw(backend, &surface.target, &surface.presentation);
        }
        backend.end_recording();
    }

    /// Runs one frame: the headless phase, then each surface in order.
    pub fn render_frame(&mut self, backend: &mut dyn RenderBackend, surfaces: &[SurfacePass]) {
        self.draw_headless(backend);
        for surface in surfaces {
            self.present(backend, surface);
        }
    }
}
