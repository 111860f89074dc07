use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::ACCEPT;
use hyper::{Body, Request};
use hyper_rustls::HttpsConnector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{downsample, Error, Result, Sample};

pub type Labels = BTreeMap<String, String>;

/// One time series of a range query result.
#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct Series {
    pub metric: Labels,
    pub samples: Vec<Sample>,
}

impl Series {
    /// The series name in Prometheus text form, e.g. `up{job="node"}`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// A copy of this series reduced to `threshold` samples.
    pub fn downsample(&self, threshold: usize) -> Series {
        Series {
            metric: self.metric.clone(),
            samples: downsample(&self.samples, threshold),
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels = self
            .metric
            .iter()
            .filter(|(k, _)| k.as_str() != "__name__")
            .peekable();
        if let Some(name) = self.metric.get("__name__") {
            f.write_str(name)?;
            if labels.peek().is_none() {
                return Ok(());
            }
        }
        f.write_str("{")?;
        for (i, (k, v)) in labels.enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=\"", k)?;
            write_escaped(f, v)?;
            f.write_str("\"")?;
        }
        f.write_str("}")
    }
}

/// Label values escaped as in the Prometheus text exposition format.
fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            c => fmt::Write::write_char(f, c)?,
        }
    }
    Ok(())
}

/// Orders label sets the way Prometheus orders a matrix: smaller sets first,
/// then by the sorted union of label names, where the set missing a name
/// sorts first, then by value.
pub fn label_set_before(a: &Labels, b: &Labels) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| {
        let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
        for name in names {
            let ord = match (a.get(name), b.get(name)) {
                (None, _) => Ordering::Less,
                (_, None) => Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(y),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    })
}

/// A `query_range` request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRange {
    pub query: String,
    pub start: SystemTime,
    pub end: SystemTime,
    pub step: Duration,
}

impl QueryRange {
    /// Query the trailing `window` up to now.
    pub fn last(query: impl Into<String>, window: Duration, step: Duration) -> Self {
        let end = SystemTime::now();
        QueryRange {
            query: query.into(),
            start: end.checked_sub(window).unwrap_or(UNIX_EPOCH),
            end,
            step,
        }
    }

    /// The request URL relative to an API base URL ending in `/`.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.join("api/v1/query_range")?;
        url.query_pairs_mut()
            .append_pair("query", &self.query)
            .append_pair("start", &unix_seconds(self.start))
            .append_pair("end", &unix_seconds(self.end))
            .append_pair("step", &self.step.as_secs_f64().to_string());
        Ok(url)
    }
}

fn unix_seconds(t: SystemTime) -> String {
    let secs = t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64();
    format!("{:.3}", secs)
}

/// Prometheus HTTP API client for range queries.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    timeout: Duration,
    http: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl Client {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let mut roots = rustls::RootCertStore::empty();
        // Plain HTTP endpoints still work without any roots.
        match rustls_native_certs::load_native_certs() {
            Ok(certs) => {
                for cert in certs {
                    if let Err(e) = roots.add(&rustls::Certificate(cert.0)) {
                        warn!(error = %e, "skipping invalid native root certificate");
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not load native root certificates"),
        }
        let tls = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        Ok(Client {
            base: base_url(base)?,
            timeout,
            http: hyper::Client::builder().build(https),
        })
    }

    /// Run a range query and return its series sorted by label set.
    pub async fn query_range(&self, query: &QueryRange) -> Result<Vec<Series>> {
        let url = query.url(&self.base)?;
        debug!(%url, "querying prometheus");

        let req = Request::get(url.as_str())
            .header(ACCEPT, "application/json")
            .body(Body::empty())?;
        let fetch = async {
            let resp = self.http.request(req).await?;
            let status = resp.status();
            let body = to_bytes(resp.into_body()).await?;
            Ok::<_, Error>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        // Prometheus reports query errors as JSON alongside 4xx/5xx statuses,
        // so the status only matters when the body is not an API envelope.
        match decode_matrix(&body) {
            Err(Error::Json(_)) if !status.is_success() => Err(Error::Status(status)),
            result => result,
        }
    }
}

/// Normalise an API base URL so relative joins keep its path.
fn base_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    status: Status,
    #[serde(default)]
    data: Option<Data>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum Data {
    Matrix(Vec<RawSeries>),
    Vector(serde_json::Value),
    Scalar(serde_json::Value),
    String(serde_json::Value),
}

impl Data {
    fn kind(&self) -> &'static str {
        match self {
            Data::Matrix(_) => "matrix",
            Data::Vector(_) => "vector",
            Data::Scalar(_) => "scalar",
            Data::String(_) => "string",
        }
    }
}

/// Values arrive as `[<unix seconds>, "<value>"]`.
#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    metric: Labels,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl TryFrom<RawSeries> for Series {
    type Error = Error;

    fn try_from(raw: RawSeries) -> Result<Self> {
        let samples = raw
            .values
            .into_iter()
            .map(|(ts, v)| -> Result<Sample> {
                let value = v.parse::<f64>().map_err(|_| Error::InvalidValue(v))?;
                Ok(Sample::new((ts * 1000.0).round() as i64, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Series {
            metric: raw.metric,
            samples,
        })
    }
}

fn decode_matrix(body: &[u8]) -> Result<Vec<Series>> {
    let resp: Response = serde_json::from_slice(body)?;
    for warning in &resp.warnings {
        warn!(%warning, "prometheus API warning");
    }

    let data = match resp.status {
        Status::Success => resp.data.ok_or(Error::MissingData)?,
        Status::Error => {
            return Err(Error::Api(
                resp.error_type.unwrap_or_default(),
                resp.error.unwrap_or_default(),
            ))
        }
    };

    let raw = match data {
        Data::Matrix(raw) => raw,
        other => return Err(Error::UnexpectedResultType(other.kind().to_string())),
    };

    let mut series = raw
        .into_iter()
        .map(Series::try_from)
        .collect::<Result<Vec<_>>>()?;
    series.sort_by(|a, b| label_set_before(&a.metric, &b.metric));
    debug!(series = series.len(), "decoded range query result");
    Ok(series)
}
