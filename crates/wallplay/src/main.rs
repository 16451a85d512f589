mod cli;
mod paths;
mod pattern;
mod plan;
mod run;
mod wall;

use anyhow::Result;
use cli::Command;
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let paths = AppPaths::discover()?;

    match cli.command {
        Command::Render(args) => run::render(&paths, args),
        Command::Plan(args) => run::plan(&paths, args),
        Command::Check(args) => run::check(&paths, args),
        Command::Where => run::where_(&paths),
    }
}
