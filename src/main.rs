use anyhow::{anyhow, Result};
use clap::Parser;
use orko::cli::{run, Cli};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // progress on stdout, warnings and errors on stderr
    let writer = std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(std::io::stdout().is_terminal() && std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow!("failed to initialise tracing: {e}"))?;
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("[ERROR] {e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
