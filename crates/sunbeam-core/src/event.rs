//! Named time windows.
//!
//! Most pipeline outputs are parameterized by event: a contiguous window of
//! telemetry with a name, optional flags, and optional numeric attributes.

use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

/// Attribute key carrying the clock-skew offset, in hours.
pub const TIME_OFFSET_ATTRIBUTE: &str = "time_offset";

/// A named time window. Value type, frozen after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub start: OffsetDateTime,
    pub stop: OffsetDateTime,
    pub flags: BTreeSet<String>,
    pub attributes: BTreeMap<String, f64>,
}

impl Event {
    pub fn new(name: impl Into<String>, start: OffsetDateTime, stop: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
            flags: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// The clock-skew offset to apply to upstream queries, if declared.
    pub fn time_offset_hours(&self) -> Option<f64> {
        self.attributes.get(TIME_OFFSET_ATTRIBUTE).copied()
    }

    pub fn duration(&self) -> time::Duration {
        self.stop - self.start
    }
}
