//! pcmfeed CLI - play raw PCM files through a paced audio sink.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{ConfigCommand, InfoCommand, PlayCommand};

/// pcmfeed CLI - play raw PCM files through a paced audio sink.
///
/// Audio is read in fixed-size chunks and handed to an emulated output
/// device that consumes it at the real playback rate. Played audio can be
/// written to a file or to stdout for piping into a system player, e.g.
///
///   pcmfeed play music.pcm -o - | aplay -f cd
///
/// Defaults are read from ~/.pcmfeed/config.yaml when it exists.
#[derive(Parser)]
#[command(name = "pcmfeed")]
#[command(about = "Raw PCM playback tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.pcmfeed/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a raw PCM file
    Play(PlayCommand),
    /// Show size and duration of a raw PCM file
    Info(InfoCommand),
    /// Manage CLI configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout may carry audio.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Play(cmd) => cmd.run(&cli),
        Commands::Info(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
