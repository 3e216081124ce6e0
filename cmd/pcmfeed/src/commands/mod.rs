//! CLI commands.

mod config;
mod info;
mod play;

pub use config::ConfigCommand;
pub use info::InfoCommand;
pub use play::PlayCommand;

use std::fs::File;
use std::io::{self, BufReader, Read};

use anyhow::Context as _;
use clap::Args;
use pcmfeed::Format;

use crate::Cli;
use crate::config::{self as cfg, Config};

/// Format overrides shared by commands that read PCM files.
#[derive(Args, Debug, Clone, Default)]
pub struct FormatArgs {
    /// Number of channels
    #[arg(long)]
    pub channels: Option<u32>,

    /// Sample rate in Hz
    #[arg(long)]
    pub rate: Option<u32>,

    /// Bits per sample
    #[arg(long)]
    pub bits: Option<u32>,
}

impl FormatArgs {
    /// Applies the overrides to `base`.
    pub fn apply(&self, base: Format) -> Format {
        Format::new(
            self.channels.unwrap_or(base.channels),
            self.rate.unwrap_or(base.sample_rate),
            self.bits.unwrap_or(base.bits_per_sample),
        )
    }
}

/// Loads the configuration selected by the global `--config` flag.
pub(crate) fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cfg::config_path(cli.config.as_deref())?;
    cfg::load_config(&path)
}

/// Opens `path` for reading, with "-" meaning stdin.
pub(crate) fn open_input(path: &str) -> anyhow::Result<Box<dyn Read + Send>> {
    if path == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path).with_context(|| format!("open {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_args_apply() {
        let args = FormatArgs {
            channels: Some(1),
            rate: None,
            bits: Some(24),
        };
        assert_eq!(args.apply(Format::STEREO_44K_16), Format::new(1, 44100, 24));
        assert_eq!(
            FormatArgs::default().apply(Format::STEREO_48K_16),
            Format::STEREO_48K_16
        );
    }

    #[test]
    fn test_open_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pcm");
        let err = open_input(path.to_str().unwrap()).err().unwrap();
        assert!(err.to_string().starts_with("open "));
    }
}
