use clap::Parser;
use snippet_relay::cli::{exit_code_for, run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment
    dotenvy::dotenv().ok();

    // Warnings and diagnostics go to stderr; stdout carries the final tally.
    let default_level = if snippet_relay::load_config::env_flag("DEBUG") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(status) => {
            tracing::info!(?status, "CLI completed");
            status.code()
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("[ERROR] {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
