use hyper::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reader has no more samples. Decoders return this on a clean end of
    /// input so callers can tell it apart from a malformed record.
    #[error("end of input")]
    Eof,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("bad csv record: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("prometheus responded with {0}")]
    Status(StatusCode),

    #[error("prometheus API error ({0}): {1}")]
    Api(String, String),

    #[error("prometheus response carried no data")]
    MissingData,

    #[error("expected a matrix result, got {0}")]
    UnexpectedResultType(String),

    #[error("invalid sample value {0:?}")]
    InvalidValue(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("unknown encoding: {0} (expected csv or json)")]
    UnknownEncoding(String),
}
