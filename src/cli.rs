use clap::Parser;
use std::path::PathBuf;

/// Fly a ROFLcopter across the terminal. Press q then Enter, or Ctrl-C, to land.
#[derive(Debug, Parser)]
#[command(name = "roflcopter", version, about)]
pub struct Cli {
    /// Write diagnostic logs to this file (filter with ROFLCOPTER_LOG)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
