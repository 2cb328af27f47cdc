//! Typed pipeline configuration.
//!
//! Three TOML documents drive a run:
//! - the primary config (`sunbeam.toml`): which stages to run, which files
//!   describe events and targets, and the two data-source sections
//! - the events description: a sequence of `[[event]]` windows
//! - the ingress description: a sequence of `[[target]]` time series
//!
//! This module parses strings into typed values and validates the
//! cross-field invariants (unique target names, positive frequencies, at
//! least one event). File I/O belongs to the driver.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::errors::ConfigError;
use crate::event::Event;
use crate::target::TimeSeriesTarget;

/// The `[config]` section of the primary config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SunbeamConfig {
    pub events_description_file: String,
    pub ingress_description_file: String,
    pub stages_to_run: Vec<String>,
    /// Root of per-stage static data directories.
    #[serde(default = "default_stage_data_root")]
    pub stage_data_root: String,
}

fn default_stage_data_root() -> String {
    "stage_data".to_string()
}

/// A `[stage_data_source]` or `[ingress_data_source]` section, tagged by
/// `data_source_type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "data_source_type")]
pub enum DataSourceConfig {
    #[serde(rename = "FSDataSource")]
    Fs {
        fs_root: String,
        /// Origin to ingress from when this source feeds ingress. Must
        /// differ from the pipeline title.
        #[serde(default)]
        ingress_origin: Option<String>,
    },

    #[serde(rename = "MongoDBDataSource")]
    MongoDb {
        ingress_origin: String,
        #[serde(default = "default_mongo_url")]
        url: String,
    },

    #[serde(rename = "InfluxDBDataSource")]
    InfluxDb {
        /// Default query window bounds, used when no event hints are given.
        start: String,
        stop: String,
        url: String,
        /// Bound on the ingress fan-out pool.
        #[serde(default = "default_workers")]
        workers: usize,
    },

    #[serde(rename = "SunbeamDataSource")]
    Sunbeam {
        #[serde(default = "default_api_url")]
        api_url: String,
        #[serde(default = "default_peer_origin")]
        ingress_origin: String,
    },
}

fn default_mongo_url() -> String {
    "mongodb://mongodb:27017/".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_api_url() -> String {
    "http://api.sunbeam.ubcsolar.com".to_string()
}

fn default_peer_origin() -> String {
    "influxdb_cache".to_string()
}

impl DataSourceConfig {
    /// The `data_source_type` tag this config was parsed from.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fs { .. } => "FSDataSource",
            Self::MongoDb { .. } => "MongoDBDataSource",
            Self::InfluxDb { .. } => "InfluxDBDataSource",
            Self::Sunbeam { .. } => "SunbeamDataSource",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrimaryFile {
    config: SunbeamConfig,
    stage_data_source: toml::Value,
    ingress_data_source: toml::Value,
}

/// Parse the primary config file into its three typed parts.
pub fn parse_primary_config(
    text: &str,
) -> Result<(SunbeamConfig, DataSourceConfig, DataSourceConfig), ConfigError> {
    let file: PrimaryFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
        what: "primary config".into(),
        message: e.to_string(),
    })?;

    let stage = parse_data_source(file.stage_data_source, "stage_data_source")?;
    let ingress = parse_data_source(file.ingress_data_source, "ingress_data_source")?;
    Ok((file.config, stage, ingress))
}

fn parse_data_source(value: toml::Value, section: &str) -> Result<DataSourceConfig, ConfigError> {
    let kind = value
        .get("data_source_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: "data_source_type".to_string(),
        })?;

    const KNOWN: [&str; 4] = [
        "FSDataSource",
        "MongoDBDataSource",
        "InfluxDBDataSource",
        "SunbeamDataSource",
    ];
    if !KNOWN.contains(&kind) {
        return Err(ConfigError::UnknownDataSourceType { kind: kind.into() });
    }

    value
        .try_into::<DataSourceConfig>()
        .map_err(|e| ConfigError::Parse {
            what: format!("[{section}]"),
            message: e.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct TargetsFile {
    #[serde(default)]
    target: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    target: TimeSeriesTarget,
}

/// Parse the ingress description into validated targets.
pub fn collect_targets(text: &str) -> Result<Vec<TimeSeriesTarget>, ConfigError> {
    let file: TargetsFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
        what: "ingress description".into(),
        message: e.to_string(),
    })?;

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut targets = Vec::with_capacity(file.target.len());

    for raw in file.target {
        if raw.kind != "TimeSeries" {
            return Err(ConfigError::UnsupportedTargetKind { kind: raw.kind });
        }
        if !seen.insert(raw.target.name.clone()) {
            return Err(ConfigError::DuplicateTarget {
                name: raw.target.name,
            });
        }
        if raw.target.frequency <= 0.0 {
            return Err(ConfigError::InvalidFrequency {
                name: raw.target.name,
                frequency: raw.target.frequency,
            });
        }
        targets.push(raw.target);
    }

    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    Ok(targets)
}

#[derive(Debug, Deserialize)]
struct EventsFile {
    #[serde(default)]
    event: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    name: String,
    start: String,
    stop: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    attributes: BTreeMap<String, f64>,
}

/// Parse the events description into validated events.
pub fn collect_events(text: &str) -> Result<Vec<Event>, ConfigError> {
    let file: EventsFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
        what: "events description".into(),
        message: e.to_string(),
    })?;

    let mut events = Vec::with_capacity(file.event.len());
    for raw in file.event {
        let start = parse_rfc3339(&raw.start, &raw.name)?;
        let stop = parse_rfc3339(&raw.stop, &raw.name)?;
        if stop <= start {
            return Err(ConfigError::Parse {
                what: format!("event `{}`", raw.name),
                message: "stop must be after start".into(),
            });
        }
        events.push(Event {
            name: raw.name,
            start,
            stop,
            flags: raw.flags.into_iter().collect(),
            attributes: raw.attributes,
        });
    }

    if events.is_empty() {
        return Err(ConfigError::NoEvents);
    }
    Ok(events)
}

fn parse_rfc3339(text: &str, event: &str) -> Result<OffsetDateTime, ConfigError> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|e| ConfigError::Parse {
        what: format!("event `{event}`"),
        message: format!("invalid RFC 3339 timestamp `{text}`: {e}"),
    })
}
