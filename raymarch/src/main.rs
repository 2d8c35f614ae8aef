//! # raymarch
//!
//! Command line front-end for the ray-march frame pipeline. `render` draws a
//! JSON scene to a PNG on the CPU or wgpu backend and can keep re-rendering
//! while the scene file is edited. `inspect` prints the packed shape table
//! the kernel would receive.

#![deny(clippy::all, clippy::pedantic)]

mod app;
mod output;
mod watcher;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raymarch", version, about = "Signed-distance shape ray-marcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a scene file to a PNG
    Render(RenderArgs),
    /// Print the ordered shape records of a scene
    Inspect {
        #[arg(long)]
        scene: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Cpu,
    Gpu,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Scene description (JSON)
    #[arg(long)]
    pub scene: PathBuf,
    #[arg(long, default_value = "frame.png")]
    pub out: PathBuf,
    /// Frames to render; the last one is written
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
    #[arg(long, value_enum, default_value_t = BackendKind::Cpu)]
    pub backend: BackendKind,
    /// Jitter seed, overrides the config file
    #[arg(long)]
    pub seed: Option<u64>,
    /// Render config (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Re-render whenever the scene file changes
    #[arg(long)]
    pub watch: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Command::Render(args) => app::render(&args),
        Command::Inspect { scene } => app::inspect(&scene),
    }
}
