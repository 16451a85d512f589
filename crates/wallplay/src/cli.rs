use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "wallplay",
    author,
    version,
    about = "Video wall canvas compositor",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render frames on the GPU and export the wall as PNG.
    Render(RenderArgs),
    /// Print the draw sequence of one frame without touching the GPU.
    Plan(PlanArgs),
    /// Validate a wall file and print the resolved canvas sizes.
    Check(CheckArgs),
    /// Print the resolved configuration directory and default wall file.
    Where,
}

#[derive(Args, Debug)]
pub struct ConfigArg {
    /// Wall description (defaults to `<config dir>/wall.toml`).
    #[arg(value_name = "CONFIG", env = "WALLPLAY_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Number of frames to render; time advances by the configured frame interval.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u32,

    /// PNG path for the composited wall output.
    #[arg(long, value_name = "PATH", default_value = "wall.png")]
    pub export: PathBuf,

    /// PNG path for the selected canvas's interface preview (requires `--select`).
    #[arg(long, value_name = "PATH")]
    pub preview_export: Option<PathBuf>,

    /// Canvas whose interface overlay is rendered.
    #[arg(long, value_name = "NAME")]
    pub select: Option<String>,

    /// Also render a control view of this size, exported next to `--export`.
    ///
    /// Canvases keep their placement on the full wall output, so a control
    /// view smaller than the output shows the bottom-left region of the wall
    /// rather than a scaled-down copy.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub control_view: Option<(u32, u32)>,

    /// Frame thickness of the interface overlay, in uv units.
    #[arg(long, value_name = "FRACTION", default_value_t = 0.01)]
    pub frame_thickness: f32,

    /// Prefer a discrete GPU over an integrated one.
    #[arg(long)]
    pub high_performance: bool,

    /// Use the software fallback adapter.
    #[arg(long, env = "WALLPLAY_FALLBACK_ADAPTER")]
    pub fallback_adapter: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Canvas whose interface overlay is planned.
    #[arg(long, value_name = "NAME")]
    pub select: Option<String>,

    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".into());
    }
    Ok((width, height))
}
