//! Canvas compositing for video walls.
//!
//! A [`Canvas`] turns decoded YUV frames into a composited RGBA output through
//! a fixed chain of shader passes, then places that output on a display
//! surface. The flow of one frame is:
//!
//! ```text
//!   VideoSource ──▶ Video ──▶ [CustomPost] ──▶ [Mask] ──▶ canvas output
//!                                                            │
//!                       selected? ──▶ Interface ──▶ preview  │
//!                                                            ▼
//!                                     surface ◀── Warp / Interface (fitted)
//! ```
//!
//! All rendering goes through the [`RenderBackend`] seam. [`GpuBackend`]
//! executes draws with `wgpu`; [`RecordingBackend`] keeps them in memory so
//! pass routing can be inspected without a GPU.

pub mod backend;
pub mod canvas;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod group;
pub mod material;
pub mod mesh;
pub mod pass;
pub mod presentation;
pub mod reflect;
pub mod runtime;
pub mod types;
pub mod uniforms;
pub mod video;
pub mod warp;

pub use backend::{
    DrawCall, DrawRecord, RecordedEvent, RecordingBackend, RecordingScope, RenderBackend,
    RenderTarget, RenderTargetDesc, SamplerBinding, TextureDesc, TextureFormat, TextureId,
};
pub use canvas::{resolve_output_size, Canvas, CanvasDescriptor};
pub use compositor::{
    route_headless_passes, CanvasCompositor, CompositorSetup, RoutedPass, TargetSlot,
};
pub use error::{CanvasError, PassError};
pub use gpu::{GpuBackend, GpuOptions};
pub use group::{CanvasGroup, SurfacePass};
pub use material::{Material, MaterialLayout};
pub use pass::ShaderPass;
pub use presentation::{Presentation, ViewMode};
pub use runtime::{
    BoxedTimeSource, FixedTimeSource, SteppedTimeSource, SystemTimeSource, TimeSample, TimeSource,
};
pub use types::{BlendMode, CanvasTransform, DepthMode, PassKind, SamplerRole, OUTPUT_CLEAR_COLOR};
pub use video::{ClipChanged, ClipSwitcher, StaticVideoSource, VideoSource, YuvPlanes};
pub use warp::CornerOffsets;
