//! Uniform-grid telemetry series.
//!
//! Upstream queries return irregular (timestamp, value) samples; the
//! pipeline works on series resampled onto a uniform grid with a fixed
//! period. Alignment of two series is over their overlapping window on the
//! finer of the two grids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One irregular sample from an upstream query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch.
    pub unix_s: f64,
    pub value: f64,
}

/// A named, unit-tagged series on a uniform time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub units: String,
    /// Grid spacing in seconds; always positive.
    pub period_s: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    pub values: Vec<f64>,
    pub meta: BTreeMap<String, String>,
}

impl TimeSeries {
    /// Build a series directly from gridded values.
    pub fn from_values(
        name: impl Into<String>,
        units: impl Into<String>,
        period_s: f64,
        start: OffsetDateTime,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            period_s,
            start,
            values,
            meta: BTreeMap::new(),
        }
    }

    /// Resample irregular query samples onto the uniform grid spanning
    /// `[start, stop)` at `period_s`. Grid points take the linear
    /// interpolation of the two bracketing samples; points outside the
    /// sampled range hold the nearest sample.
    ///
    /// Returns `None` when there are no samples or the window is empty.
    pub fn from_samples(
        name: impl Into<String>,
        units: impl Into<String>,
        period_s: f64,
        start: OffsetDateTime,
        stop: OffsetDateTime,
        samples: &[Sample],
    ) -> Option<Self> {
        if samples.is_empty() || period_s <= 0.0 || stop <= start {
            return None;
        }

        let mut sorted: Vec<Sample> = samples.to_vec();
        sorted.sort_by(|a, b| a.unix_s.total_cmp(&b.unix_s));

        let start_s = unix_seconds(start);
        let duration_s = unix_seconds(stop) - start_s;
        let len = (duration_s / period_s).round() as usize;
        if len == 0 {
            return None;
        }

        let mut values = Vec::with_capacity(len);
        let mut upper = 0usize;
        for i in 0..len {
            let t = start_s + i as f64 * period_s;

            // First sample at-or-after t; sorted scan, t is monotone.
            while upper < sorted.len() && sorted[upper].unix_s < t {
                upper += 1;
            }

            let v = match (upper.checked_sub(1).map(|j| sorted[j]), sorted.get(upper)) {
                (None, Some(after)) => after.value,
                (Some(before), None) => before.value,
                (Some(before), Some(after)) => {
                    let span = after.unix_s - before.unix_s;
                    if span <= f64::EPSILON {
                        after.value
                    } else {
                        let frac = (t - before.unix_s) / span;
                        before.value + frac * (after.value - before.value)
                    }
                }
                (None, None) => unreachable!("samples is non-empty"),
            };
            values.push(v);
        }

        Some(Self {
            name: name.into(),
            units: units.into(),
            period_s,
            start,
            values,
            meta: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// End of the grid (exclusive).
    pub fn stop(&self) -> OffsetDateTime {
        self.start + time::Duration::seconds_f64(self.period_s * self.values.len() as f64)
    }

    /// Resample this series onto a new grid by linear interpolation.
    pub fn resampled(
        &self,
        period_s: f64,
        start: OffsetDateTime,
        stop: OffsetDateTime,
    ) -> Option<Self> {
        let base = unix_seconds(self.start);
        let samples: Vec<Sample> = self
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample {
                unix_s: base + i as f64 * self.period_s,
                value: v,
            })
            .collect();
        let mut out =
            Self::from_samples(&self.name, &self.units, period_s, start, stop, &samples)?;
        out.meta = self.meta.clone();
        Some(out)
    }

    /// Align two series onto their overlapping window at the finer period.
    /// Returns `None` when the windows do not overlap.
    pub fn align(a: &Self, b: &Self) -> Option<(Self, Self)> {
        let start = if a.start > b.start { a.start } else { b.start };
        let stop = if a.stop() < b.stop() { a.stop() } else { b.stop() };
        if stop <= start {
            return None;
        }
        let period = a.period_s.min(b.period_s);
        Some((
            a.resampled(period, start, stop)?,
            b.resampled(period, start, stop)?,
        ))
    }

    /// Combine two aligned series elementwise. The result inherits this
    /// series' grid; the caller names and re-units the output.
    pub fn zip_map(
        &self,
        other: &Self,
        name: impl Into<String>,
        units: impl Into<String>,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(&x, &y)| f(x, y))
            .collect();
        Self {
            name: name.into(),
            units: units.into(),
            period_s: self.period_s,
            start: self.start,
            values,
            meta: BTreeMap::new(),
        }
    }

    /// Map values in place, preserving grid and metadata.
    pub fn map(&self, name: impl Into<String>, units: impl Into<String>, f: impl Fn(f64) -> f64) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            period_s: self.period_s,
            start: self.start,
            values: self.values.iter().map(|&v| f(v)).collect(),
            meta: self.meta.clone(),
        }
    }
}

fn unix_seconds(t: OffsetDateTime) -> f64 {
    t.unix_timestamp_nanos() as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn grid(values: &[f64], period_s: f64) -> TimeSeries {
        TimeSeries::from_values(
            "test",
            "V",
            period_s,
            datetime!(2024-07-16 17:00:00 UTC),
            values.to_vec(),
        )
    }

    #[test]
    fn resamples_one_hour_at_one_hz_to_3600_points() {
        let start = datetime!(2024-07-16 17:00:00 UTC);
        let stop = datetime!(2024-07-16 18:00:00 UTC);
        let samples: Vec<Sample> = (0..360)
            .map(|i| Sample {
                unix_s: start.unix_timestamp() as f64 + i as f64 * 10.0,
                value: i as f64,
            })
            .collect();

        let ts = TimeSeries::from_samples("PackCurrent", "A", 1.0, start, stop, &samples).unwrap();
        assert_eq!(ts.len(), 3600);
        // Linear interpolation between decisecond samples.
        assert!((ts.values[5] - 0.5).abs() < 1e-9);
        // Past the last sample the series holds its final value.
        assert_eq!(ts.values[3599], 359.0);
    }

    #[test]
    fn empty_samples_yield_no_series() {
        let start = datetime!(2024-07-16 17:00:00 UTC);
        let stop = datetime!(2024-07-16 18:00:00 UTC);
        assert!(TimeSeries::from_samples("x", "V", 1.0, start, stop, &[]).is_none());
    }

    #[test]
    fn align_trims_to_overlap_and_finer_grid() {
        let mut a = grid(&[1.0; 100], 1.0);
        let b = grid(&[2.0; 30], 2.0);
        a.start += time::Duration::seconds(10);

        let (a2, b2) = TimeSeries::align(&a, &b).unwrap();
        assert_eq!(a2.period_s, 1.0);
        assert_eq!(a2.len(), b2.len());
        // Overlap is [10s, 60s) of b's window: 50 seconds at 1 Hz.
        assert_eq!(a2.len(), 50);
    }

    #[test]
    fn zip_map_multiplies_elementwise() {
        let a = grid(&[2.0, 3.0], 1.0);
        let b = grid(&[4.0, 5.0], 1.0);
        let p = a.zip_map(&b, "power", "W", |x, y| x * y);
        assert_eq!(p.values, vec![8.0, 15.0]);
        assert_eq!(p.units, "W");
    }
}
