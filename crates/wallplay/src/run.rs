use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use compositor::{
    resolve_output_size, CanvasGroup, GpuBackend, GpuOptions, Presentation, RecordingBackend,
    RenderBackend, SurfacePass,
};
use glam::UVec2;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, PlanArgs, RenderArgs};
use crate::paths::AppPaths;
use crate::plan::FramePlan;
use crate::wall::{create_surface, LoadedWall};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn select_canvas(
    group: &mut CanvasGroup,
    backend: &mut dyn RenderBackend,
    name: Option<&str>,
) -> Result<()> {
    let Some(name) = name else {
        return Ok(());
    };
    if !group.select(backend, name)? {
        let available: Vec<_> = group.canvases().iter().map(|canvas| canvas.name()).collect();
        bail!(
            "unknown canvas '{name}'; available canvases: {}",
            available.join(", ")
        );
    }
    Ok(())
}

/// `wall.png` becomes `wall-control.png`.
fn control_export_path(export: &Path) -> PathBuf {
    let stem = export
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("wall");
    let name = match export.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}-control.{ext}"),
        None => format!("{stem}-control.png"),
    };
    export.with_file_name(name)
}

pub fn render(paths: &AppPaths, args: RenderArgs) -> Result<()> {
    if args.preview_export.is_some() && args.select.is_none() {
        bail!("--preview-export requires --select");
    }
    let path = paths.resolve_config(args.config.config.as_deref());
    let wall = LoadedWall::load(&path)?;

    let mut backend = GpuBackend::new(GpuOptions {
        high_performance: args.high_performance,
        force_fallback_adapter: args.fallback_adapter,
    })
    .context("failed to initialise the GPU backend")?;
    tracing::info!(
        adapter = backend.adapter_name(),
        config = %path.display(),
        frames = args.frames,
        "rendering wall"
    );

    let mut group = wall.build(&mut backend)?;
    select_canvas(&mut group, &mut backend, args.select.as_deref())?;
    group.set_frame_thickness(args.frame_thickness);

    let output = wall.create_output_surface(&mut backend)?;
    let mut surfaces = vec![SurfacePass {
        presentation: Presentation::final_output(&output),
        target: output.clone(),
    }];
    if let Some((width, height)) = args.control_view {
        let control = create_surface(&mut backend, "control view", UVec2::new(width, height))?;
        surfaces.push(SurfacePass {
            presentation: Presentation::control_view(&control, wall.output_size())
                .with_interface(true),
            target: control,
        });
    }

    for frame in 0..args.frames.max(1) {
        group.render_frame(&mut backend, &surfaces);
        tracing::debug!(frame, "rendered frame");
    }

    backend.export_png(&output, &args.export)?;
    println!("Exported wall output to {}", args.export.display());

    if let Some(control) = surfaces.get(1) {
        let path = control_export_path(&args.export);
        backend.export_png(&control.target, &path)?;
        println!("Exported control view to {}", path.display());
    }

    if let Some(preview_path) = &args.preview_export {
        if let Some(preview) = group.preview_target() {
            backend.export_png(preview, preview_path)?;
            println!("Exported interface preview to {}", preview_path.display());
        }
    }

    Ok(())
}

pub fn plan(paths: &AppPaths, args: PlanArgs) -> Result<()> {
    let path = paths.resolve_config(args.config.config.as_deref());
    let wall = LoadedWall::load(&path)?;

    let mut backend = RecordingBackend::new();
    let mut group = wall.build(&mut backend)?;
    select_canvas(&mut group, &mut backend, args.select.as_deref())?;
    let output = wall.create_output_surface(&mut backend)?;

    backend.clear();
    group.render_frame(
        &mut backend,
        &[SurfacePass {
            presentation: Presentation::final_output(&output).with_interface(args.select.is_some()),
            target: output.clone(),
        }],
    );
    let events = backend.take_events();
    let plan = FramePlan::from_events(&backend, &events);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("failed to serialise frame plan")?
        );
    } else {
        print!("{}", plan.to_text());
    }
    Ok(())
}

pub fn check(paths: &AppPaths, args: CheckArgs) -> Result<()> {
    let path = paths.resolve_config(args.config.config.as_deref());
    let wall = LoadedWall::load(&path)?;
    let config = &wall.config;

    println!("Wall {} is valid", path.display());
    println!(
        "  output:         {}x{}",
        config.output.width, config.output.height
    );
    println!("  frame interval: {:?}", config.frame_interval);
    println!("Canvases:");
    for canvas in &config.canvases {
        let source = UVec2::new(canvas.source.width, canvas.source.height);
        let size = resolve_output_size(canvas.resolution, canvas.aspect_ratio, source);
        let mut stages = vec!["video"];
        if canvas.post_shader.is_some() {
            stages.push("custom-post");
        }
        if canvas.mask.is_some() {
            stages.push("mask");
        }
        println!(
            "  {:<16} source={}x{} ({}) output={}x{} passes={}",
            canvas.name,
            source.x,
            source.y,
            canvas.source.pattern,
            size.x,
            size.y,
            stages.join("+")
        );
    }
    Ok(())
}

pub fn where_(paths: &AppPaths) -> Result<()> {
    let wall_file = paths.wall_file();
    println!("Configuration directories:");
    println!("  config: {}", paths.config_dir().display());
    println!(
        "  wall:   {} ({})",
        wall_file.display(),
        if wall_file.exists() { "present" } else { "missing" }
    );
    Ok(())
}
