use anyhow::Result;
use clap::Parser;
use pennywise::cli::Cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    cli.run().await
}

/// Log to stderr so command output on stdout stays clean. `RUST_LOG` overrides the default level.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "pennywise=debug" } else { "pennywise=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
