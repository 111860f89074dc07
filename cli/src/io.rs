use eyre::{Result, WrapErr};
use futures::TryStreamExt as _;
use lttb::{Encoding, Sample};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, BufReader, BufWriter};

/// A buffered sample source: stdin or a file.
pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// A buffered sink: stdout or a file. Callers flush when done.
pub type Output = BufWriter<Box<dyn AsyncWrite + Unpin + Send>>;

/// Open `name` for reading; `stdin` names standard input.
pub async fn open(name: &str) -> Result<Input> {
    if name == "stdin" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let f = File::open(name)
        .await
        .wrap_err_with(|| format!("opening {}", name))?;
    Ok(Box::new(BufReader::new(f)))
}

/// Create `name` for writing; `stdout` names standard output.
pub async fn create(name: &str) -> Result<Output> {
    let sink: Box<dyn AsyncWrite + Unpin + Send> = if name == "stdout" {
        Box::new(tokio::io::stdout())
    } else {
        let f = File::create(name)
            .await
            .wrap_err_with(|| format!("creating {}", name))?;
        Box::new(f)
    };
    Ok(BufWriter::new(sink))
}

/// Peek at the buffered input to pick a sample encoding. `None` means the
/// input is empty.
pub async fn detect_encoding<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<Encoding>> {
    let buf = input.fill_buf().await?;
    if buf.is_empty() {
        return Ok(None);
    }
    let first = buf
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
        .unwrap_or(b'\n');
    Ok(Some(Encoding::detect(first)))
}

/// Input names default to stdin when none are given.
pub fn sources(files: &[String]) -> Vec<String> {
    if files.is_empty() {
        vec!["stdin".to_string()]
    } else {
        files.to_vec()
    }
}

/// Read every sample from `source`, detecting its encoding.
pub async fn read_samples(source: &str) -> Result<Vec<Sample>> {
    let mut input = open(source).await?;
    let Some(encoding) = detect_encoding(&mut input).await? else {
        return Ok(Vec::new());
    };
    lttb::samples(encoding, input)
        .try_collect()
        .await
        .wrap_err_with(|| format!("decoding {}", source))
}
