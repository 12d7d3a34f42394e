//! Offline host for the side blur effect: decodes frames, optionally
//! letterboxes them to a target aspect ratio, runs them through the effect on
//! the GPU (or the CPU reference path) and writes the results.

mod cli;
mod config;
mod export;
mod paths;
mod present;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Render(args) => run::render(args),
        Command::Sequence(args) => run::sequence(args),
    }
}
