use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

use crate::{Error, Result, Sample, Series};

/// Line-oriented sample encoding. Encoders do not flush; callers flush once
/// they are done writing.
#[async_trait]
pub trait Codec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()>;
    async fn decode<R: AsyncBufRead + Unpin + Send>(&self, reader: &mut R) -> Result<Sample>;
}

/// One `{"timestamp":..,"value":..}` object per line.
pub struct JsonCodec;

#[async_trait]
impl Codec for JsonCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        let mut line = serde_json::to_vec(sample)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(&self, reader: &mut R) -> Result<Sample> {
        let mut buf = Vec::new();
        next_line(reader, &mut buf).await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

/// Headerless `timestamp,value` rows. Both columns are read as floats and the
/// timestamp is truncated, so fixtures with fractional timestamps still load.
/// Rows without exactly two fields, or with a non-finite timestamp, are
/// rejected.
pub struct CsvCodec;

#[async_trait]
impl Codec for CsvCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        let line = csv_row((sample.timestamp, sample.value))?;
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(&self, reader: &mut R) -> Result<Sample> {
        let mut buf = Vec::new();
        next_line(reader, &mut buf).await?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(buf.as_slice());
        let invalid = || Error::InvalidValue(String::from_utf8_lossy(&buf).trim().to_string());
        let record = match rdr.records().next() {
            Some(record) => record?,
            None => return Err(invalid()),
        };
        if record.len() != 2 {
            return Err(invalid());
        }
        let (x, y) = record.deserialize::<(f64, f64)>(None)?;
        if !x.is_finite() {
            return Err(invalid());
        }
        Ok(Sample::new(x as i64, y))
    }
}

/// Reads the next non-blank line into `buf`.
async fn next_line<R: AsyncBufRead + Unpin + Send>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<()> {
    loop {
        buf.clear();
        if reader.read_until(b'\n', buf).await? == 0 {
            return Err(Error::Eof);
        }
        if !buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
    }
}

fn csv_row<T: serde::Serialize>(record: T) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.serialize(record)?;
    wtr.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// The encodings understood on the command line, dispatching to the codecs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Csv,
    Json,
}

impl Encoding {
    /// Guess the encoding of a stream from its first byte.
    pub fn detect(first: u8) -> Self {
        if first == b'{' {
            Encoding::Json
        } else {
            Encoding::Csv
        }
    }

    /// Write a whole labelled series. JSON emits one object per series; CSV
    /// emits `metric,timestamp,value` rows.
    pub async fn encode_series<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        series: &Series,
    ) -> Result<()> {
        match self {
            Encoding::Json => {
                let mut line = serde_json::to_vec(series)?;
                line.push(b'\n');
                writer.write_all(&line).await?;
            }
            Encoding::Csv => {
                let name = series.name();
                for s in &series.samples {
                    let line = csv_row((name.as_str(), s.timestamp, s.value))?;
                    writer.write_all(&line).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Codec for Encoding {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        match self {
            Encoding::Csv => CsvCodec.encode(writer, sample).await,
            Encoding::Json => JsonCodec.encode(writer, sample).await,
        }
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(&self, reader: &mut R) -> Result<Sample> {
        match self {
            Encoding::Csv => CsvCodec.decode(reader).await,
            Encoding::Json => JsonCodec.decode(reader).await,
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Encoding::Csv),
            "json" => Ok(Encoding::Json),
            _ => Err(Error::UnknownEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Csv => f.write_str("csv"),
            Encoding::Json => f.write_str("json"),
        }
    }
}

/// Decode samples from `reader` until it runs dry. A decoding error is
/// yielded once and ends the stream.
pub fn samples<C, R>(codec: C, reader: R) -> impl Stream<Item = Result<Sample>>
where
    C: Codec + Send + Sync,
    R: AsyncBufRead + Unpin + Send,
{
    futures::stream::unfold(Some((codec, reader)), |state| async move {
        let (codec, mut reader) = state?;
        match codec.decode(&mut reader).await {
            Ok(sample) => Some((Ok(sample), Some((codec, reader)))),
            Err(Error::Eof) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}
