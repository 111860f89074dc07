use clap::Args;
use eyre::{Result, WrapErr};
use futures::StreamExt as _;
use lttb::{Codec, Encoding};
use tokio::io::AsyncWriteExt;

use crate::io::{create, detect_encoding, open, sources};

#[derive(Args, Debug)]
pub struct Opts {
    /// Output encoding (csv, json)
    #[clap(long, default_value = "json")]
    pub to: Encoding,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn encode(opts: &Opts) -> Result<()> {
    let mut output = create(&opts.output).await?;

    for source in sources(&opts.files) {
        let mut input = open(&source).await?;
        let Some(encoding) = detect_encoding(&mut input).await? else {
            continue;
        };

        let mut samples = Box::pin(lttb::samples(encoding, input));
        while let Some(sample) = samples.next().await {
            let sample = sample.wrap_err_with(|| format!("decoding {}", source))?;
            opts.to.encode(&mut output, &sample).await?;
        }
    }

    output.flush().await?;
    Ok(())
}
