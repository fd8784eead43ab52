use crate::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Presents shaded-surface stimuli and records one keypress per trial.
#[derive(Parser, Debug)]
#[command(name = "sheen", version, about)]
pub struct Cli {
    /// Session file (JSON) listing the trials to run.
    pub session: PathBuf,

    /// Where to write the trial results.
    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,

    /// Run without a window. Trials can only end on their timers.
    #[arg(long)]
    pub headless: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long, value_enum, default_value = "human", env = "SHEEN_LOG_FORMAT")]
    pub log_format: LogFormat,
}
