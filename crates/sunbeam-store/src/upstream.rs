//! Upstream telemetry backend (InfluxDB).
//!
//! Read-only. A canonical path is interpreted as the query address
//! `(bucket, measurement, car, field)`; retrieval hints carry the time
//! window. The window offset (hours) is added to both bounds before
//! querying, accommodating clock skew between the telemetry logger and the
//! event description.
//!
//! Results come back as an annotated-CSV Flux response and are surfaced as
//! a two-column query frame (`unix_s`, `value`); ingress is responsible for
//! resampling onto the target grid.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, ConfigError, DataError, DataResult, DataSource,
    FileType, Payload, QueryHints, StoreError,
};

/// Column names of the query frame surfaced by [`InfluxDataSource::get`].
pub const QUERY_TIME_COLUMN: &str = "unix_s";
pub const QUERY_VALUE_COLUMN: &str = "value";

/// Environment variables holding upstream credentials.
pub const TOKEN_ENV: &str = "INFLUX_TOKEN";
pub const ORG_ENV: &str = "INFLUX_ORG";

pub struct InfluxDataSource {
    client: Client,
    url: String,
    org: String,
    token: String,
    /// Default window bounds, used when a query carries no hints.
    default_start: OffsetDateTime,
    default_stop: OffsetDateTime,
}

impl InfluxDataSource {
    /// Build a client against `url` with the configured default window.
    /// Credentials are read from the process environment.
    pub fn new(url: &str, start: &str, stop: &str) -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| ConfigError::MissingKey {
            section: "environment".into(),
            key: TOKEN_ENV.into(),
        })?;
        let org = std::env::var(ORG_ENV).map_err(|_| ConfigError::MissingKey {
            section: "environment".into(),
            key: ORG_ENV.into(),
        })?;

        let default_start = parse_bound(start)?;
        let default_stop = parse_bound(stop)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ConfigError::Parse {
                what: "upstream HTTP client".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            org,
            token,
            default_start,
            default_stop,
        })
    }

    fn window(&self, hints: &QueryHints) -> (OffsetDateTime, OffsetDateTime) {
        let shift = time::Duration::seconds_f64(hints.offset_hours.unwrap_or(0.0) * 3600.0);
        let start = hints.start.unwrap_or(self.default_start) + shift;
        let stop = hints.stop.unwrap_or(self.default_stop) + shift;
        (start, stop)
    }

    fn flux(path: &CanonicalPath, start: &str, stop: &str) -> String {
        let (bucket, measurement, car, field) = path.unpack();
        format!(
            "from(bucket: \"{bucket}\")\n\
             |> range(start: {start}, stop: {stop})\n\
             |> filter(fn: (r) => r[\"_measurement\"] == \"{measurement}\" and \
             r[\"car\"] == \"{car}\" and r[\"_field\"] == \"{field}\")\n\
             |> keep(columns: [\"_time\", \"_value\"])"
        )
    }
}

impl DataSource for InfluxDataSource {
    fn store(&self, _artifact: Artifact) -> Result<ArtifactLoader, StoreError> {
        Err(StoreError::NotAllowed {
            backend: "InfluxDataSource",
        })
    }

    fn get(&self, path: &CanonicalPath, hints: &QueryHints) -> DataResult<Artifact> {
        let (start, stop) = self.window(hints);
        let start = format_bound(start, path)?;
        let stop = format_bound(stop, path)?;
        let flux = Self::flux(path, &start, &stop);
        debug!(%path, %start, %stop, "querying upstream telemetry");

        let response = self
            .client
            .post(format!("{}/api/v2/query", self.url))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(flux)
            .send()
            .map_err(|e| DataError::Network {
                message: format!("upstream query for {path} failed"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(DataError::query(
                path.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("upstream returned {status}: {body}"),
                ),
            ));
        }

        let body = response.text().map_err(|e| DataError::Network {
            message: format!("failed to read upstream response for {path}"),
            source: Some(Box::new(e)),
        })?;

        let (times, values) = parse_annotated_csv(&body, path)?;
        let mut frame = BTreeMap::new();
        frame.insert(QUERY_TIME_COLUMN.to_string(), times);
        frame.insert(QUERY_VALUE_COLUMN.to_string(), values);

        Ok(Artifact::new(
            path.clone(),
            FileType::DataFrame,
            Some(Payload::DataFrame(frame)),
        ))
    }
}

fn parse_bound(text: &str) -> Result<OffsetDateTime, ConfigError> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|e| ConfigError::Parse {
        what: "ingress_data_source window bound".into(),
        message: format!("invalid RFC 3339 timestamp `{text}`: {e}"),
    })
}

fn format_bound(t: OffsetDateTime, path: &CanonicalPath) -> DataResult<String> {
    t.format(&Rfc3339)
        .map_err(|e| DataError::query(path.clone(), e))
}

/// Parse a Flux annotated-CSV response into (times, values). Annotation
/// rows start with `#`; the header row names the columns; tables may repeat
/// the header, so headers are re-detected as they appear.
fn parse_annotated_csv(body: &str, path: &CanonicalPath) -> DataResult<(Vec<f64>, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut time_idx: Option<usize> = None;
    let mut value_idx: Option<usize> = None;
    let mut times = Vec::new();
    let mut values = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| DataError::decode(path.clone(), e))?;

        if record.iter().any(|f| f == "_time") {
            time_idx = record.iter().position(|f| f == "_time");
            value_idx = record.iter().position(|f| f == "_value");
            continue;
        }

        let (Some(ti), Some(vi)) = (time_idx, value_idx) else {
            continue;
        };
        let (Some(t), Some(v)) = (record.get(ti), record.get(vi)) else {
            continue;
        };
        if t.is_empty() {
            continue;
        }

        let t = OffsetDateTime::parse(t, &Rfc3339)
            .map_err(|e| DataError::decode(path.clone(), e))?;
        let v: f64 = v
            .parse()
            .map_err(|e| DataError::decode(path.clone(), e))?;
        times.push(t.unix_timestamp_nanos() as f64 / 1e9);
        values.push(v);
    }

    Ok((times, values))
}
