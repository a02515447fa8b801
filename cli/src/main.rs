//! n8n-provision - provision a host to run n8n behind nginx with TLS

use clap::Parser;
use tracing_subscriber::EnvFilter;

use n8n_provision::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
