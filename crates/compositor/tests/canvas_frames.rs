use std::time::Duration;

use compositor::geometry::fitted_model_matrix;
use compositor::material::stock_layout;
use compositor::uniforms::WarpUniforms;
use compositor::{
    Canvas, CanvasDescriptor, CanvasError, CanvasGroup, CanvasTransform, ClipSwitcher,
    CornerOffsets, DrawRecord, FixedTimeSource, PassError, PassKind, Presentation,
    RecordedEvent, RecordingBackend, RecordingScope, RenderBackend, RenderTarget,
    RenderTargetDesc, StaticVideoSource, SteppedTimeSource, SurfacePass, TextureDesc,
    TextureFormat, TextureId, YuvPlanes,
};
use glam::{UVec2, Vec2, Vec3};

const POST_SHADER: &str = r#"
struct Mvp {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
};

struct PostParams {
    tint: vec3<f32>,
    time: f32,
};

@group(0) @binding(0) var<uniform> mvp: Mvp;
@group(0) @binding(1) var<uniform> UBO: PostParams;
@group(1) @binding(0) var inTexture: texture_2d<f32>;
@group(1) @binding(1) var inTextureSampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = mvp.projectionMatrix * mvp.viewMatrix * mvp.modelMatrix * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(inTexture, inTextureSampler, in.uv);
    return vec4<f32>(color.rgb * UBO.tint * (0.5 + 0.5 * sin(UBO.time)), color.a);
}
"#;

fn upload_planes(backend: &mut RecordingBackend, size: UVec2) -> YuvPlanes {
    let chroma = (size / 2).max(UVec2::ONE);
    let mut plane = |label: &str, size: UVec2| {
        let desc = TextureDesc {
            label: label.to_string(),
            size,
            format: TextureFormat::R8,
        };
        backend
            .create_texture(&desc, &vec![128; (size.x * size.y) as usize])
            .unwrap()
    };
    YuvPlanes {
        y: plane("y", size),
        u: plane("u", chroma),
        v: plane("v", chroma),
    }
}

fn upload_mask(backend: &mut RecordingBackend, size: UVec2) -> TextureId {
    let desc = TextureDesc {
        label: "mask".to_string(),
        size,
        format: TextureFormat::R8,
    };
    backend
        .create_texture(&desc, &vec![255; (size.x * size.y) as usize])
        .unwrap()
}

fn build_canvas(
    backend: &mut RecordingBackend,
    descriptor: CanvasDescriptor,
    source_size: UVec2,
) -> (Canvas, ClipSwitcher) {
    let planes = upload_planes(backend, source_size);
    let (source, switcher) = StaticVideoSource::new(source_size, planes);
    let canvas = Canvas::new(
        backend,
        descriptor,
        Box::new(source),
        Box::new(FixedTimeSource::new(0.0)),
    )
    .unwrap();
    (canvas, switcher)
}

fn surface(backend: &mut RecordingBackend, size: UVec2) -> RenderTarget {
    backend
        .create_render_target(&RenderTargetDesc {
            label: "surface".to_string(),
            size,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        })
        .unwrap()
}

fn draws(events: &[RecordedEvent]) -> Vec<&DrawRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            RecordedEvent::Draw(draw) => Some(draw),
            _ => None,
        })
        .collect()
}

#[test]
fn video_only_canvas_draws_once_into_its_output() {
    let mut backend = RecordingBackend::new();
    let mut descriptor = CanvasDescriptor::new("left");
    descriptor.resolution = Some(480);
    let (canvas, _switcher) = build_canvas(&mut backend, descriptor, UVec2::new(640, 480));
    assert_eq!(canvas.output().size, UVec2::new(640, 480));
    let output = canvas.output().clone();

    let mut group = CanvasGroup::new(vec![canvas]);
    backend.clear();
    group.render_frame(&mut backend, &[]);

    let events = backend.take_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], RecordedEvent::Begin(RecordingScope::Headless));
    assert_eq!(events[2], RecordedEvent::End);
    let video = draws(&events)[0];
    assert_eq!(video.pass, PassKind::Video);
    assert_eq!(video.target, output.id);
    assert_eq!(video.material, "stock-video");
}

#[test]
fn mask_composites_from_first_scratch_target() {
    let mut backend = RecordingBackend::new();
    let mask = upload_mask(&mut backend, UVec2::new(64, 64));
    let mut descriptor = CanvasDescriptor::new("masked");
    descriptor.mask = Some(mask);
    let (canvas, _switcher) = build_canvas(&mut backend, descriptor, UVec2::new(320, 240));
    let output = canvas.output().clone();
    let scratch = canvas.compositor().scratch_targets()[0].clone();

    let mut group = CanvasGroup::new(vec![canvas]);
    backend.clear();
    group.draw_headless(&mut backend);

    let events = backend.take_events();
    let draws = draws(&events);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].pass, PassKind::Video);
    assert_eq!(draws[0].target, scratch.id);
    assert_eq!(draws[1].pass, PassKind::Mask);
    assert_eq!(draws[1].target, output.id);
    assert_eq!(draws[1].sampled("inTexture"), Some(scratch.color));
    assert_eq!(draws[1].sampled("maskTexture"), Some(mask));
}

#[test]
fn post_and_mask_never_sample_their_own_target() {
    let mut backend = RecordingBackend::new();
    let mask = upload_mask(&mut backend, UVec2::new(16, 16));
    let post = backend.load_material("ripple", POST_SHADER).unwrap();
    let mut descriptor = CanvasDescriptor::new("full");
    descriptor.mask = Some(mask);
    descriptor.post_material = Some(post);

    let planes = upload_planes(&mut backend, UVec2::new(320, 240));
    let (source, _switcher) = StaticVideoSource::new(UVec2::new(320, 240), planes);
    let canvas = Canvas::new(
        &mut backend,
        descriptor,
        Box::new(source),
        Box::new(SteppedTimeSource::new(1.0, Duration::from_millis(500))),
    )
    .unwrap();
    let output = canvas.output().clone();
    let mut group = CanvasGroup::new(vec![canvas]);

    for frame in 0..2 {
        backend.clear();
        group.draw_headless(&mut backend);
        let events = backend.take_events();
        let draws = draws(&events);
        let passes: Vec<_> = draws.iter().map(|draw| draw.pass).collect();
        assert_eq!(
            passes,
            vec![PassKind::Video, PassKind::CustomPost, PassKind::Mask]
        );
        assert!(draws.iter().all(|draw| !draw.reads_target()));
        assert_eq!(draws[2].target, output.id);

        let params = draws[1].params.as_ref().expect("post params");
        let time = f32::from_ne_bytes(params[12..16].try_into().unwrap());
        assert_eq!(time, 1.0 + 0.5 * frame as f32);
    }
}

#[test]
fn missing_stock_material_fails_canvas_creation() {
    let mut backend = RecordingBackend::new().without_stock_material(PassKind::Warp);
    let planes = upload_planes(&mut backend, UVec2::new(8, 8));
    let (source, _switcher) = StaticVideoSource::new(UVec2::new(8, 8), planes);
    let result = Canvas::new(
        &mut backend,
        CanvasDescriptor::new("broken"),
        Box::new(source),
        Box::new(FixedTimeSource::new(0.0)),
    );
    match result {
        Err(CanvasError::Pass { canvas, source }) => {
            assert_eq!(canvas, "broken");
            assert_eq!(
                source,
                PassError::MissingMaterial {
                    pass: PassKind::Warp,
                    material: "stock-warp".into(),
                }
            );
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("canvas without a warp material was created"),
    }
}

#[test]
fn mask_material_without_mask_sampler_is_rejected() {
    let mut layout = stock_layout(PassKind::Mask);
    layout.samplers.retain(|name| name != "maskTexture");
    let mut backend = RecordingBackend::new().with_stock_layout(PassKind::Mask, layout);
    let mask = upload_mask(&mut backend, UVec2::new(4, 4));
    let planes = upload_planes(&mut backend, UVec2::new(8, 8));
    let (source, _switcher) = StaticVideoSource::new(UVec2::new(8, 8), planes);
    let mut descriptor = CanvasDescriptor::new("unmasked");
    descriptor.mask = Some(mask);

    let err = Canvas::new(
        &mut backend,
        descriptor,
        Box::new(source),
        Box::new(FixedTimeSource::new(0.0)),
    )
    .err()
    .expect("missing mask sampler must fail");
    let message = err.to_string();
    assert!(message.contains("unmasked"), "{message}");
    assert!(message.contains("maskTexture"), "{message}");
}

#[test]
fn corner_offsets_reach_the_warp_draw() {
    let mut backend = RecordingBackend::new();
    let (mut canvas, _switcher) =
        build_canvas(&mut backend, CanvasDescriptor::new("warped"), UVec2::new(100, 100));
    let offsets = CornerOffsets {
        top_left: Vec2::new(0.1, 0.2),
        top_right: Vec2::new(0.3, 0.4),
        bottom_left: Vec2::new(0.5, 0.6),
        bottom_right: Vec2::new(0.7, 0.8),
    };
    canvas.set_corner_offsets(offsets);
    assert_eq!(canvas.corner_offsets(), offsets);

    let target = surface(&mut backend, UVec2::new(200, 200));
    let mut group = CanvasGroup::new(vec![canvas]);
    backend.clear();
    group.present(
        &mut backend,
        &SurfacePass {
            presentation: Presentation::final_output(&target),
            target: target.clone(),
        },
    );

    let events = backend.take_events();
    assert_eq!(events[0], RecordedEvent::Begin(RecordingScope::Surface(target.clone())));
    let warp = draws(&events)[0];
    assert_eq!(warp.pass, PassKind::Warp);
    assert_eq!(warp.target, target.id);
    let uniforms: WarpUniforms = bytemuck::pod_read_unaligned(warp.params.as_ref().unwrap());
    assert_eq!(uniforms.top_left(), Vec3::new(0.1, -0.2, 0.0));
    assert_eq!(uniforms.top_right(), Vec3::new(-0.3, -0.4, 0.0));
    assert_eq!(uniforms.bottom_left(), Vec3::new(0.5, 0.6, 0.0));
    assert_eq!(uniforms.bottom_right(), Vec3::new(-0.7, 0.8, 0.0));
}

#[test]
fn clip_change_rebinds_video_planes() {
    let mut backend = RecordingBackend::new();
    let (canvas, switcher) =
        build_canvas(&mut backend, CanvasDescriptor::new("clips"), UVec2::new(64, 48));
    let output_size = canvas.output().size;
    let next = upload_planes(&mut backend, UVec2::new(128, 96));
    let mut group = CanvasGroup::new(vec![canvas]);

    switcher.switch(UVec2::new(128, 96), next);
    backend.clear();
    group.draw_headless(&mut backend);

    let events = backend.take_events();
    let video = draws(&events)[0];
    assert_eq!(video.sampled("yTexture"), Some(next.y));
    assert_eq!(video.sampled("uTexture"), Some(next.u));
    assert_eq!(video.sampled("vTexture"), Some(next.v));
    assert_eq!(group.canvases()[0].output().size, output_size);
}

#[test]
fn selected_canvas_presents_its_interface_overlay() {
    let mut backend = RecordingBackend::new();
    let (left, _a) = build_canvas(&mut backend, CanvasDescriptor::new("left"), UVec2::new(64, 64));
    let (right, _b) =
        build_canvas(&mut backend, CanvasDescriptor::new("right"), UVec2::new(32, 32));
    let right_output = right.output().clone();
    let left_output = left.output().clone();
    let mut group = CanvasGroup::new(vec![left, right]);

    assert!(!group.select(&mut backend, "missing").unwrap());
    assert!(group.select(&mut backend, "right").unwrap());
    group.set_frame_thickness(0.05);
    group.set_cursor_position(Vec3::new(0.5, 0.5, 0.0));
    let preview = group.preview_target().cloned().expect("preview target");
    assert_eq!(preview.size, right_output.size);

    let target = surface(&mut backend, UVec2::new(640, 360));
    let surfaces = [SurfacePass {
        presentation: Presentation::final_output(&target).with_interface(true),
        target,
    }];
    backend.clear();
    group.render_frame(&mut backend, &surfaces);

    let events = backend.take_events();
    let draws = draws(&events);
    let passes: Vec<_> = draws.iter().map(|draw| draw.pass).collect();
    assert_eq!(
        passes,
        vec![
            PassKind::Video,
            PassKind::Video,
            PassKind::Interface,
            PassKind::Warp,
            PassKind::Warp
        ]
    );
    let interface = draws[2];
    assert_eq!(interface.target, preview.id);
    assert_eq!(interface.sampled("inTexture"), Some(right_output.color));
    let params = interface.params.as_ref().unwrap();
    assert_eq!(f32::from_ne_bytes(params[12..16].try_into().unwrap()), 0.05);

    assert_eq!(draws[3].sampled("inTexture"), Some(left_output.color));
    assert_eq!(draws[4].sampled("inTexture"), Some(preview.color));
    assert!(draws.iter().all(|draw| !draw.reads_target()));

    group.clear_selection();
    backend.clear();
    group.render_frame(&mut backend, &surfaces);
    let events = backend.take_events();
    let warp = events
        .iter()
        .filter_map(|event| match event {
            RecordedEvent::Draw(draw) if draw.pass == PassKind::Warp => Some(draw),
            _ => None,
        })
        .last()
        .unwrap();
    assert_eq!(warp.sampled("inTexture"), Some(right_output.color));
}

#[test]
fn interface_surface_before_any_overlay_presents_the_output() {
    let mut backend = RecordingBackend::new();
    let (canvas, _switcher) =
        build_canvas(&mut backend, CanvasDescriptor::new("fresh"), UVec2::new(48, 48));
    let output = canvas.output().clone();
    let mut group = CanvasGroup::new(vec![canvas]);
    assert!(group.select(&mut backend, "fresh").unwrap());

    let target = surface(&mut backend, UVec2::new(96, 96));
    let surface = SurfacePass {
        presentation: Presentation::final_output(&target).with_interface(true),
        target,
    };
    backend.clear();
    group.present(&mut backend, &surface);

    let events = backend.take_events();
    let draws = draws(&events);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].pass, PassKind::Warp);
    assert_eq!(draws[0].sampled("inTexture"), Some(output.color));
}

#[test]
fn reselecting_releases_the_previous_preview() {
    let mut backend = RecordingBackend::new();
    let (small, _a) = build_canvas(&mut backend, CanvasDescriptor::new("small"), UVec2::new(16, 16));
    let (large, _b) = build_canvas(&mut backend, CanvasDescriptor::new("large"), UVec2::new(64, 32));
    let small_output = small.output().clone();
    let mut group = CanvasGroup::new(vec![small, large]);

    assert!(group.select(&mut backend, "small").unwrap());
    group.draw_headless(&mut backend);
    let first = group.preview_target().cloned().unwrap();
    let live = backend.target_count();

    for name in ["large", "small", "large", "small"] {
        assert!(group.select(&mut backend, name).unwrap());
        assert_eq!(backend.target_count(), live);
    }
    assert_eq!(backend.texture_label(first.color), None);

    // The overlay drawn into the released preview is no longer presented.
    let target = surface(&mut backend, UVec2::new(64, 64));
    let surface = SurfacePass {
        presentation: Presentation::final_output(&target).with_interface(true),
        target,
    };
    backend.clear();
    group.present(&mut backend, &surface);
    let events = backend.take_events();
    let draws = draws(&events);
    assert_eq!(draws[0].sampled("inTexture"), Some(small_output.color));
    assert!(draws
        .iter()
        .all(|draw| draw.sampled("inTexture") != Some(first.color)));
}

#[test]
fn control_view_mirrors_placement_of_main_output() {
    let mut backend = RecordingBackend::new();
    let mut descriptor = CanvasDescriptor::new("tile");
    descriptor.transform = CanvasTransform {
        translate: Vec2::new(0.25, 0.0),
        scale: Vec2::splat(0.5),
        rotation: 0.0,
    };
    let (canvas, _switcher) = build_canvas(&mut backend, descriptor, UVec2::new(1920, 1080));
    let output_size = canvas.output().size;
    let mut group = CanvasGroup::new(vec![canvas]);

    let reference = UVec2::new(3840, 2160);
    let preview = surface(&mut backend, UVec2::new(480, 270));
    let presentation = Presentation::control_view(&preview, reference);
    backend.clear();
    group.present(
        &mut backend,
        &SurfacePass {
            target: preview.clone(),
            presentation,
        },
    );

    let events = backend.take_events();
    let warp = draws(&events)[0];
    let expected = fitted_model_matrix(
        reference,
        output_size,
        &group.canvases()[0].transform(),
    );
    assert_eq!(warp.model, expected);
    assert_eq!(warp.projection, presentation.projection);
    assert_eq!(warp.target, preview.id);
}

#[test]
fn frames_open_one_headless_scope_then_one_per_surface() {
    let mut backend = RecordingBackend::new();
    let (canvas, _switcher) =
        build_canvas(&mut backend, CanvasDescriptor::new("solo"), UVec2::new(16, 16));
    let first = surface(&mut backend, UVec2::new(64, 64));
    let second = surface(&mut backend, UVec2::new(32, 32));
    let surfaces = [
        SurfacePass {
            presentation: Presentation::final_output(&first),
            target: first.clone(),
        },
        SurfacePass {
            presentation: Presentation::final_output(&second),
            target: second.clone(),
        },
    ];
    let mut group = CanvasGroup::new(vec![canvas]);
    backend.clear();
    group.render_frame(&mut backend, &surfaces);

    let scopes: Vec<_> = backend
        .events()
        .iter()
        .filter_map(|event| match event {
            RecordedEvent::Begin(scope) => Some(scope.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        scopes,
        vec![
            RecordingScope::Headless,
            RecordingScope::Surface(first),
            RecordingScope::Surface(second),
        ]
    );
    assert!(backend.draws().all(|draw| draw.scope.is_some()));
}
