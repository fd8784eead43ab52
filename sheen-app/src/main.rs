mod app;
mod cli;
mod keys;
mod logging;
mod runner;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::Cli;
use sheen_experiment::SessionConfig;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format, cli.verbose);

    let config = SessionConfig::from_path(&cli.session)
        .with_context(|| format!("loading session {}", cli.session.display()))?;
    info!(
        trials = config.trials.len(),
        width = config.canvas.width,
        height = config.canvas.height,
        headless = cli.headless,
        "session loaded"
    );

    let report = if cli.headless {
        runner::run_headless(config, &cli.output)?
    } else {
        App::run(config, cli.output.clone())?
    };
    info!(output = %cli.output.display(), "results written");
    runner::summarize(report)
}
