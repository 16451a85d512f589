//! Per-canvas pass graph.
//!
//! A compositor owns the passes of one canvas, the persistent output target
//! and two scratch targets. Every frame it routes the present passes through
//! those targets so the output ends up holding the video, post and mask chain
//! without any draw sampling the target it writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, UVec2, Vec3};
use tracing::{debug, warn};

use crate::backend::{RenderBackend, RenderTarget, RenderTargetDesc, TextureId};
use crate::error::CanvasError;
use crate::geometry::{fitted_model_matrix, fullscreen_model_matrix, orthographic_projection};
use crate::material::Material;
use crate::pass::ShaderPass;
use crate::presentation::Presentation;
use crate::runtime::BoxedTimeSource;
use crate::types::{CanvasTransform, PassKind, SamplerRole};
use crate::video::YuvPlanes;
use crate::warp::CornerOffsets;

/// A target a headless pass can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSlot {
    /// The persistent output target.
    Output,
    /// One of the two scratch targets.
    Scratch(usize),
}

/// One step of the headless chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutedPass {
    pub pass: PassKind,
    /// Target sampled as the pass input; the video pass reads its planes.
    pub input: Option<TargetSlot>,
    pub output: TargetSlot,
}

/// Orders the headless passes and assigns their targets.
///
/// The last route always writes [`TargetSlot::Output`], and no route reads
/// the slot it writes.
pub fn route_headless_passes(has_post: bool, has_mask: bool) -> Vec<RoutedPass> {
    let mut routes = Vec::with_capacity(3);
    let mut current = if has_post || has_mask {
        TargetSlot::Scratch(0)
    } else {
        TargetSlot::Output
    };
    routes.push(RoutedPass {
        pass: PassKind::Video,
        input: None,
        output: current,
    });

    if has_post {
        let output = if has_mask {
            TargetSlot::Scratch(1)
        } else {
            TargetSlot::Output
        };
        routes.push(RoutedPass {
            pass: PassKind::CustomPost,
            input: Some(current),
            output,
        });
        current = output;
    }

    if has_mask {
        routes.push(RoutedPass {
            pass: PassKind::Mask,
            input: Some(current),
            output: TargetSlot::Output,
        });
    }

    routes
}

/// Inputs for building a [`CanvasCompositor`].
#[derive(Debug, Clone)]
pub struct CompositorSetup {
    /// Name used for targets, logs and errors.
    pub label: String,
    pub output_size: UVec2,
    pub clear_color: [f32; 4],
    pub planes: YuvPlanes,
    pub mask: Option<TextureId>,
    pub post_material: Option<Arc<Material>>,
    pub corner_offsets: CornerOffsets,
}

pub struct CanvasCompositor {
    label: String,
    passes: BTreeMap<PassKind, ShaderPass>,
    output: RenderTarget,
    scratch: [RenderTarget; 2],
    current: TargetSlot,
    interface_output: Option<TextureId>,
    corner_offsets: CornerOffsets,
    time: BoxedTimeSource,
}

impl CanvasCompositor {
    pub fn new(
        backend: &mut dyn RenderBackend,
        setup: CompositorSetup,
        time: BoxedTimeSource,
    ) -> Result<Self, CanvasError> {
        let label = setup.label;
        let size = setup.output_size.max(UVec2::ONE);
        let mut create_target = |suffix: &str, what: &'static str| {
            backend
                .create_render_target(&RenderTargetDesc {
                    label: format!("{label} {suffix}"),
                    size,
                    clear_color: setup.clear_color,
                })
                .map_err(|err| CanvasError::resource(&label, what, err))
        };
        let output = create_target("output", "output target")?;
        let scratch = [
            create_target("scratch a", "scratch target")?,
            create_target("scratch b", "scratch target")?,
        ];

        let pass_error = |err| CanvasError::pass(&label, err);
        let mut passes = BTreeMap::new();

        let video = ShaderPass::new(
            PassKind::Video,
            backend.stock_material(PassKind::Video),
            &[
                (SamplerRole::Y, setup.planes.y),
                (SamplerRole::U, setup.planes.u),
                (SamplerRole::V, setup.planes.v),
            ],
        )
        .map_err(pass_error)?;
        passes.insert(PassKind::Video, video);

        if let Some(material) = setup.post_material {
            let post = ShaderPass::new(
                PassKind::CustomPost,
                Some(material),
                &[(SamplerRole::Input, scratch[0].color)],
            )
            .map_err(pass_error)?;
            if post.params().post().is_some_and(|params| !params.has_time()) {
                debug!(canvas = %label, "custom post material has no float 'time' uniform");
            }
            passes.insert(PassKind::CustomPost, post);
        }

        if let Some(mask) = setup.mask {
            let mask_pass = ShaderPass::new(
                PassKind::Mask,
                backend.stock_material(PassKind::Mask),
                &[
                    (SamplerRole::Input, scratch[0].color),
                    (SamplerRole::Mask, mask),
                ],
            )
            .map_err(pass_error)?;
            passes.insert(PassKind::Mask, mask_pass);
        }

        let interface = ShaderPass::new(
            PassKind::Interface,
            backend.stock_material(PassKind::Interface),
            &[(SamplerRole::Input, output.color)],
        )
        .map_err(pass_error)?;
        passes.insert(PassKind::Interface, interface);

        let mut warp = ShaderPass::new(
            PassKind::Warp,
            backend.stock_material(PassKind::Warp),
            &[(SamplerRole::Input, output.color)],
        )
        .map_err(pass_error)?;
        warp.set_corner_offsets(&setup.corner_offsets);
        passes.insert(PassKind::Warp, warp);

        debug!(
            canvas = %label,
            width = size.x,
            height = size.y,
            passes = ?passes.keys().collect::<Vec<_>>(),
            "canvas compositor ready"
        );

        Ok(Self {
            label,
            passes,
            output,
            scratch,
            current: TargetSlot::Output,
            interface_output: None,
            corner_offsets: setup.corner_offsets,
            time,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The persistent output target holding the composited frame.
    pub fn output(&self) -> &RenderTarget {
        &self.output
    }

    pub fn scratch_targets(&self) -> &[RenderTarget; 2] {
        &self.scratch
    }

    /// Slot written by the most recent headless pass.
    pub fn current_target(&self) -> TargetSlot {
        self.current
    }

    pub fn pass(&self, kind: PassKind) -> Option<&ShaderPass> {
        self.passes.get(&kind)
    }

    pub fn has_pass(&self, kind: PassKind) -> bool {
        self.passes.contains_key(&kind)
    }

    /// Headless routing for the passes this canvas has.
    pub fn routes(&self) -> Vec<RoutedPass> {
        route_headless_passes(
            self.has_pass(PassKind::CustomPost),
            self.has_pass(PassKind::Mask),
        )
    }

    pub fn target(&self, slot: TargetSlot) -> &RenderTarget {
        match slot {
            TargetSlot::Output => &self.output,
            TargetSlot::Scratch(index) => &self.scratch[index % 2],
        }
    }

    /// Renders video, custom post and mask into the output target.
    ///
    /// Must run inside a headless recording scope.
    pub fn draw_all_headless_passes(&mut self, backend: &mut dyn RenderBackend) {
        for route in self.routes() {
            let target = self.target(route.output).clone();
            let input = route.input.map(|slot| self.target(slot).color);
            let time = (route.pass == PassKind::CustomPost).then(|| self.time.sample());

            let Some(pass) = self.passes.get_mut(&route.pass) else {
                continue;
            };
            if let Some(texture) = input {
                pass.bind(SamplerRole::Input, texture);
            }
            if let Some(sample) = time {
                pass.set_time(sample.seconds);
            }
            pass.set_matrices(
                fullscreen_model_matrix(target.size),
                Mat4::IDENTITY,
                orthographic_projection(target.size),
            );
            backend.submit(&pass.draw_call(&target));
            self.current = route.output;
        }
    }

    /// Renders the interface overlay of the output target into `target`.
    ///
    /// Must run inside a headless recording scope, after the headless chain.
    pub fn draw_interface(&mut self, backend: &mut dyn RenderBackend, target: &RenderTarget) {
        if target.id == self.output.id || self.scratch.iter().any(|scratch| scratch.id == target.id) {
            warn!(canvas = %self.label, "interface target must not be a canvas-owned target");
            return;
        }
        let output = self.output.color;
        let Some(pass) = self.passes.get_mut(&PassKind::Interface) else {
            return;
        };
        pass.bind(SamplerRole::Input, output);
        pass.set_matrices(
            fullscreen_model_matrix(target.size),
            Mat4::IDENTITY,
            orthographic_projection(target.size),
        );
        backend.submit(&pass.draw_call(target));
        self.interface_output = Some(target.color);
    }

    /// Drops the remembered interface overlay, e.g. after its target was
    /// released, and presents the plain output again.
    pub fn clear_interface_output(&mut self) {
        self.interface_output = None;
        self.set_final_sampler(false);
    }

    /// Chooses what the warp pass presents: the interface overlay or the
    /// plain output.
    pub fn set_final_sampler(&mut self, is_interface: bool) {
        let texture = match (is_interface, self.interface_output) {
            (true, Some(texture)) => texture,
            (true, None) => {
                debug!(canvas = %self.label, "no interface output rendered yet; presenting output");
                self.output.color
            }
            (false, _) => self.output.color,
        };
        if let Some(warp) = self.passes.get_mut(&PassKind::Warp) {
            warp.bind(SamplerRole::Input, texture);
        }
    }

    /// Draws the warped canvas into a presented surface.
    ///
    /// Must run inside that surface's recording scope.
    pub fn on_draw(
        &mut self,
        backend: &mut dyn RenderBackend,
        surface: &RenderTarget,
        presentation: &Presentation,
        transform: &CanvasTransform,
    ) {
        let reference = presentation.reference_size(surface);
        let model = fitted_model_matrix(reference, self.output.size, transform);
        let Some(warp) = self.passes.get_mut(&PassKind::Warp) else {
            return;
        };
        warp.set_matrices(model, presentation.view, presentation.projection);
        backend.submit(&warp.draw_call(surface));
    }

    pub fn corner_offsets(&self) -> CornerOffsets {
        self.corner_offsets
    }

    pub fn set_corner_offsets(&mut self, offsets: CornerOffsets) {
        self.corner_offsets = offsets;
        if let Some(warp) = self.passes.get_mut(&PassKind::Warp) {
            warp.set_corner_offsets(&offsets);
        }
    }

    pub fn set_frame_thickness(&mut self, thickness: f32) {
        if let Some(pass) = self.passes.get_mut(&PassKind::Interface) {
            pass.set_frame_thickness(thickness);
        }
    }

    pub fn set_cursor_position(&mut self, position: Vec3) {
        if let Some(pass) = self.passes.get_mut(&PassKind::Interface) {
            pass.set_cursor_position(position);
        }
    }

    /// Points the video pass at a new set of planes.
    pub fn rebind_planes(&mut self, planes: YuvPlanes) {
        if let Some(video) = self.passes.get_mut(&PassKind::Video) {
            video.bind(SamplerRole::Y, planes.y);
            video.bind(SamplerRole::U, planes.u);
            video.bind(SamplerRole::V, planes.v);
        }
    }
}
