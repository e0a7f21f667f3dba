use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use fanout::config::Config;
use fanout::registry::{CommandRegistry, CommandSpec};
use fanout::runner::run_commands;
use fanout::{report, tui};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "fanout",
    version,
    about = "Run shell commands in parallel with a live status dashboard."
)]
struct Cli {
    /// Keep running the other commands when one fails.
    #[arg(long)]
    continue_on_error: bool,

    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "fanout.toml")]
    config: PathBuf,

    /// Commands to run. Each argument is handed to the shell as one string,
    /// so pipes, `&&` and redirects work: 'cargo test' 'make lint 2>&1'.
    #[arg(required = true, value_name = "COMMAND")]
    commands: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    // The dashboard owns the terminal, so diagnostics go to a file.
    let log_file = std::fs::File::create(&config.log.file)
        .with_context(|| format!("Failed to create log file: {}", config.log.file))?;
    let filter = std::env::var("FANOUT_LOG").unwrap_or_else(|_| config.log.filter.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(log_file)
        .init();

    let specs: Vec<CommandSpec> = cli
        .commands
        .iter()
        .filter(|raw| !raw.is_empty())
        .enumerate()
        .map(|(index, raw)| CommandSpec::shell(index, raw))
        .collect();
    if specs.is_empty() {
        anyhow::bail!("no non-empty commands provided");
    }

    let registry = CommandRegistry::new(specs);
    let (update_tx, update_rx) = mpsc::channel(config.runner.update_capacity.max(1));
    let (cancel_tx, _) = watch::channel(false);
    let cancel = Arc::new(cancel_tx);

    let coordinator = tokio::spawn(run_commands(
        registry.clone(),
        update_tx,
        cancel.clone(),
        cli.continue_on_error,
    ));

    tui::run_dashboard(
        registry.clone(),
        update_rx,
        cli.continue_on_error,
        config.ui.min_sidebar_width,
    )
    .await?;

    // The dashboard can exit before the run does (user quit, fail-fast);
    // stop whatever is still in flight so the report shows settled state.
    if !registry.all_terminal() {
        cancel.send_replace(true);
    }
    let _ = coordinator.await;

    report::print_report(&registry)?;
    std::process::exit(report::exit_code(&registry));
}
