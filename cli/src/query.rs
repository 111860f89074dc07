use clap::Args;
use duration_string::DurationString;
use eyre::{Result, WrapErr};
use lttb::{Client, Encoding, QueryRange};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::io::create;

#[derive(Args, Debug)]
pub struct Opts {
    /// Prometheus server URL
    #[clap(long, env = "PROMETHEUS_URL", default_value = "http://localhost:9090")]
    pub url: String,

    /// How far back to query
    #[clap(long, short = 'd', default_value = "15m")]
    pub duration: DurationString,

    /// Query resolution step
    #[clap(long, default_value = "1s")]
    pub step: DurationString,

    /// Request timeout
    #[clap(long, default_value = "30s")]
    pub timeout: DurationString,

    /// Maximum number of samples to keep per series
    #[clap(long, env = "LTTB_THRESHOLD", default_value_t = 800)]
    pub threshold: usize,

    /// Output encoding (json, csv)
    #[clap(long, default_value = "json")]
    pub to: Encoding,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// PromQL expression; words are joined with spaces
    #[clap(required = true)]
    pub query: Vec<String>,
}

pub async fn query(opts: &Opts) -> Result<()> {
    let step: Duration = opts.step.into();
    if step.is_zero() {
        eyre::bail!("--step must be greater than zero");
    }

    let client = Client::new(&opts.url, opts.timeout.into())?;
    let range = QueryRange::last(opts.query.join(" "), opts.duration.into(), step);
    let series = client
        .query_range(&range)
        .await
        .wrap_err_with(|| format!("querying {}", opts.url))?;

    if series.is_empty() {
        warn!(query = %range.query, "query returned no series");
    }

    let mut output = create(&opts.output).await?;
    for s in &series {
        let reduced = s.downsample(opts.threshold);
        debug!(
            series = %s,
            samples = s.samples.len(),
            kept = reduced.samples.len(),
            "downsampled"
        );
        opts.to.encode_series(&mut output, &reduced).await?;
    }
    output.flush().await?;
    Ok(())
}
