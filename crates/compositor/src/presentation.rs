use glam::{Mat4, UVec2};

use crate::backend::RenderTarget;
use crate::geometry::orthographic_projection;

/// How a canvas is placed on the surface it is presented into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Positioned by the canvas transform on the real output.
    Final,
    /// Mirrors the placement on the main output while drawing into a
    /// different surface, such as an editor preview.
    ControlView { reference_size: UVec2 },
}

/// Camera and mode for one presented surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub mode: ViewMode,
    pub view: Mat4,
    pub projection: Mat4,
    /// Present the selected canvas with its interface overlay.
    pub show_interface: bool,
}

impl Presentation {
    /// Pixel-space camera over `surface`.
    pub fn final_output(surface: &RenderTarget) -> Self {
        Self {
            mode: ViewMode::Final,
            view: Mat4::IDENTITY,
            projection: orthographic_projection(surface.size),
            show_interface: false,
        }
    }

    /// Pixel-space camera over `surface`, fitting canvases as if drawn into a
    /// surface of `reference_size`.
    pub fn control_view(surface: &RenderTarget, reference_size: UVec2) -> Self {
        Self {
            mode: ViewMode::ControlView { reference_size },
            ..Self::final_output(surface)
        }
    }

    pub fn with_interface(mut self, show_interface: bool) -> Self {
        self.show_interface = show_interface;
        self
    }

    /// Size the warp quad is fitted against.
    pub fn reference_size(&self, surface: &RenderTarget) -> UVec2 {
        match self.mode {
            ViewMode::Final => surface.size,
            ViewMode::ControlView { reference_size } => reference_size,
        }
    }
}
