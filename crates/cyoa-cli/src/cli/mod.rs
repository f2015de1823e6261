//! CLI for the CYOA downloader.

mod archive;
mod download;
mod output;

use anyhow::Result;
use clap::Parser;
use cyoa_core::config;
use cyoa_core::logging;
use cyoa_core::pipeline::Mode;

/// Download a CYOA project and its images.
///
/// By default images are embedded into a single `<name>.json`. With `--zip`
/// they are downloaded next to `project.json` and archived as `<name>.zip`.
#[derive(Debug, Parser)]
#[command(name = "cyoa")]
#[command(about = "Download a CYOA project with its images", long_about = None)]
pub struct Cli {
    /// Page, project or gateway URL.
    pub url: String,

    /// Output name without extension; derived from the project URL when omitted.
    pub filename: Option<String>,

    /// Download images into a zip archive instead of embedding them.
    #[arg(short, long)]
    pub zip: bool,

    /// Produce both the embedded JSON and the zip archive.
    #[arg(short, long)]
    pub both: bool,

    /// Seconds to wait before retrying an image after HTTP 429 (config default: 60).
    #[arg(short, long, value_name = "SECS")]
    pub wait_time: Option<u64>,

    /// Concurrent image downloads (config default: 1).
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Log to the state directory file instead of stderr.
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Outputs to produce: `--both` wins, then `--zip`, else embed only.
    pub fn mode(&self) -> Mode {
        if self.both {
            Mode::BOTH
        } else if self.zip {
            Mode::DOWNLOAD
        } else {
            Mode::EMBED
        }
    }

    fn init_logging(&self) {
        if !self.log_file {
            logging::init_logging_stderr();
            return;
        }
        if let Err(e) = logging::init_logging() {
            logging::init_logging_stderr();
            tracing::warn!("file logging unavailable ({:#}), using stderr", e);
        }
    }

    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        cli.init_logging();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        download::run_download(&cli, &cfg)
    }
}
