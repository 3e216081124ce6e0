//! Play command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Args;
use pcmfeed::{Feeder, FeedOutcome, IoWriter, PcmPlayer, ThreadSink};
use tracing::{info, warn};

use super::FormatArgs;
use crate::Cli;
use crate::config::Config;

/// Extra time allowed for the device to finish after the last chunk.
const DRAIN_SLACK: Duration = Duration::from_secs(2);

/// Play a raw PCM file
#[derive(Args)]
pub struct PlayCommand {
    /// Raw PCM file ("-" for stdin)
    pub file: String,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum chunks queued ahead of the device
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Write played audio to a file ("-" for stdout); discarded otherwise
    #[arg(short, long)]
    pub output: Option<String>,

    /// Play as fast as the output accepts data
    #[arg(long)]
    pub no_realtime: bool,

    /// Stop feeding after this many seconds
    #[arg(long)]
    pub max_seconds: Option<f64>,
}

impl PlayCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = self.resolve(super::load_config(cli)?);
        cfg.format.validate()?;
        if cfg.chunk_size == 0 {
            anyhow::bail!("chunk size must be greater than 0");
        }
        if cfg.chunk_size as u64 % cfg.format.frame_bytes() != 0 {
            warn!(
                chunk_size = cfg.chunk_size,
                frame_bytes = cfg.format.frame_bytes(),
                "chunk size is not a whole number of frames"
            );
        }

        let input = super::open_input(&self.file)?;
        let sink = ThreadSink::new(IoWriter::new(self.open_output()?))
            .with_realtime(cfg.realtime)
            .with_slots(cfg.device_slots);
        let player = Arc::new(PcmPlayer::new(sink, cfg.player.clone()));
        player.init(cfg.format).context("initialize player")?;

        info!(
            file = %self.file,
            format = %cfg.format,
            chunk_size = cfg.chunk_size,
            queue_depth = cfg.player.max_queue_depth,
            realtime = cfg.realtime,
            "playing"
        );

        let feeder = Feeder::new(Arc::clone(&player), cfg.chunk_size);
        if let Some(secs) = self.max_seconds {
            let limit = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid --max-seconds {}", secs))?;
            let stop = feeder.stop_handle();
            let _timer = thread::Builder::new()
                .name("pcmfeed-timer".into())
                .spawn(move || {
                    thread::sleep(limit);
                    stop.stop();
                })?;
        }

        let start = Instant::now();
        let summary = feeder.run(input)?;

        let timeout = drain_timeout(&cfg);
        if summary.outcome == FeedOutcome::Exhausted && !player.drain(timeout) {
            warn!(timeout = ?timeout, "playback did not finish in time");
        }
        let stats = player.stats();
        player.stop();
        player.release();

        info!(
            outcome = ?summary.outcome,
            chunks = summary.chunks,
            bytes = summary.bytes,
            audio = ?cfg.format.duration(summary.bytes),
            elapsed = ?start.elapsed(),
            dropped = stats.chunks_dropped,
            underruns = stats.underruns,
            buffers = stats.buffers_allocated,
            "done"
        );
        Ok(())
    }

    /// Applies command-line overrides to the loaded configuration.
    fn resolve(&self, mut cfg: Config) -> Config {
        cfg.format = self.format.apply(cfg.format);
        if let Some(size) = self.chunk_size {
            cfg.chunk_size = size;
        }
        if let Some(depth) = self.queue_depth {
            cfg.player.max_queue_depth = depth;
        }
        if self.no_realtime {
            cfg.realtime = false;
        }
        cfg
    }

    fn open_output(&self) -> anyhow::Result<Box<dyn Write + Send>> {
        Ok(match self.output.as_deref() {
            None => Box::new(io::sink()),
            Some("-") => Box::new(io::stdout()),
            Some(path) => {
                let file = File::create(path).with_context(|| format!("create {}", path))?;
                Box::new(BufWriter::new(file))
            }
        })
    }
}

/// Upper bound on the time queued and in-device audio takes to play out.
fn drain_timeout(cfg: &Config) -> Duration {
    let backlog = cfg.player.max_queue_depth.max(1).saturating_add(cfg.device_slots);
    let bytes = backlog.saturating_mul(cfg.chunk_size) as u64;
    cfg.format.duration(bytes).saturating_add(DRAIN_SLACK)
}
