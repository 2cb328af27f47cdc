//! Ingress targets.
//!
//! A target describes one time series to fetch from the upstream telemetry
//! database: where it lives (bucket, measurement, car, field) and how to
//! shape it (frequency, units).

use serde::Deserialize;

/// Description of a time series to fetch from upstream telemetry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeSeriesTarget {
    pub name: String,
    pub field: String,
    pub measurement: String,
    /// Sampling frequency in Hz; the stored series has period `1/frequency`.
    pub frequency: f64,
    pub units: String,
    pub car: String,
    pub bucket: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TimeSeriesTarget {
    /// Grid spacing of the ingested series, in seconds.
    pub fn period_s(&self) -> f64 {
        1.0 / self.frequency
    }
}
