//! Info command.

use std::time::Duration;

use anyhow::Context as _;
use clap::Args;
use pcmfeed::Format;

use super::FormatArgs;
use crate::Cli;

/// Show size and duration of a raw PCM file
#[derive(Args)]
pub struct InfoCommand {
    /// Raw PCM file
    pub file: String,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

impl InfoCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = super::load_config(cli)?;
        let format = self.format.apply(cfg.format);
        format.validate()?;
        let chunk_size = self.chunk_size.unwrap_or(cfg.chunk_size).max(1);

        let meta =
            std::fs::metadata(&self.file).with_context(|| format!("stat {}", self.file))?;
        let info = FileInfo::new(meta.len(), format, chunk_size);

        println!("File:      {}", self.file);
        println!("Format:    {}", format);
        println!("Size:      {} bytes", info.size);
        println!("Duration:  {:.3}s", info.duration.as_secs_f64());
        println!("Chunks:    {} x {} bytes", info.chunks, chunk_size);
        if info.trailing_bytes > 0 {
            println!(
                "Warning:   {} trailing bytes do not form a whole frame",
                info.trailing_bytes
            );
        }
        Ok(())
    }
}

/// Playback figures for a PCM file of a given size.
#[derive(Debug, PartialEq, Eq)]
struct FileInfo {
    size: u64,
    duration: Duration,
    chunks: u64,
    trailing_bytes: u64,
}

impl FileInfo {
    fn new(size: u64, format: Format, chunk_size: usize) -> Self {
        Self {
            size,
            duration: format.duration(size),
            chunks: size.div_ceil(chunk_size as u64),
            trailing_bytes: size % format.frame_bytes(),
        }
    }
}
