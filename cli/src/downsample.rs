use clap::Args;
use eyre::Result;
use lttb::{Codec, Encoding};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::io::{create, read_samples, sources};

#[derive(Args, Debug)]
pub struct Opts {
    /// Maximum number of samples to keep
    #[clap(long, env = "LTTB_THRESHOLD", default_value_t = 800)]
    pub threshold: usize,

    /// Output encoding (csv, json)
    #[clap(long, default_value = "csv")]
    pub to: Encoding,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files, concatenated into one series [default: stdin]
    pub files: Vec<String>,
}

pub async fn downsample(opts: &Opts) -> Result<()> {
    let mut series = Vec::new();
    for source in sources(&opts.files) {
        series.extend(read_samples(&source).await?);
    }

    if series.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        warn!("input is not sorted by timestamp; the selection will not follow its shape");
    }

    let reduced = lttb::downsample(&series, opts.threshold);
    debug!(
        samples = series.len(),
        kept = reduced.len(),
        threshold = opts.threshold,
        "downsampled"
    );

    let mut output = create(&opts.output).await?;
    for sample in &reduced {
        opts.to.encode(&mut output, sample).await?;
    }
    output.flush().await?;
    Ok(())
}
