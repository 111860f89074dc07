mod downsample;
mod encode;
mod io;
mod query;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lttb",
    version,
    about = "Downsample time series with Largest-Triangle-Three-Buckets"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Downsample samples read from files or stdin
    Downsample(downsample::Opts),
    /// Run a Prometheus range query and downsample every series
    Query(query::Opts),
    /// Transcode samples between encodings
    Encode(encode::Opts),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs go to stderr; stdout carries samples.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Downsample(opts) => downsample::downsample(&opts).await,
        Command::Query(opts) => query::query(&opts).await,
        Command::Encode(opts) => encode::encode(&opts).await,
    }
}
