//! Model and projection matrices for the unit plane.
//!
//! Every pass draws a 1x1 plane centred on the origin. These helpers place
//! that plane in pixel space: either covering a target edge to edge, or
//! letterboxed into it while keeping the source aspect ratio.

use glam::{Mat4, UVec2, Vec2};

use crate::types::CanvasTransform;

/// Smallest extent used for any target or texture dimension.
pub const MIN_EXTENT: f32 = 1.0;

fn guarded_extent(size: UVec2) -> Vec2 {
    size.as_vec2().max(Vec2::splat(MIN_EXTENT))
}

/// Model matrix that makes the unit plane cover `target` exactly.
pub fn fullscreen_model_matrix(target: UVec2) -> Mat4 {
    let size = guarded_extent(target);
    Mat4::from_translation((size * 0.5).extend(0.0)) * Mat4::from_scale(size.extend(1.0))
}

/// Largest extent with the aspect ratio of `source` that fits inside `target`.
pub fn fitted_extent(target: UVec2, source: UVec2) -> Vec2 {
    let target = guarded_extent(target);
    let source = guarded_extent(source);
    let canvas_ratio = source.x / source.y;
    let window_ratio = target.x / target.y;

    let mut extent = target;
    if window_ratio > canvas_ratio {
        extent.x = target.y * canvas_ratio;
    } else {
        extent.y = target.x / canvas_ratio;
    }
    extent
}

/// Model matrix that letterboxes a `source`-shaped plane into `target` and
/// then applies the canvas translation and scale.
///
/// `transform.rotation` is ignored.
pub fn fitted_model_matrix(target: UVec2, source: UVec2, transform: &CanvasTransform) -> Mat4 {
    let buffer = guarded_extent(target);
    let extent = fitted_extent(target, source) * transform.scale;
    let translate = transform.translate * buffer + buffer * 0.5;
    Mat4::from_translation(translate.extend(0.0)) * Mat4::from_scale(extent.extend(1.0))
}

/// Orthographic projection spanning `[0, width] x [0, height]`.
pub fn orthographic_projection(target: UVec2) -> Mat4 {
    let size = guarded_extent(target);
    Mat4::orthographic_rh(0.0, size.x, 0.0, size.y, -1.0, 1.0)
}
