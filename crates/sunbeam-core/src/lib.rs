//! sunbeam-core
//!
//! Core primitives for the Sunbeam pipeline engine:
//! - Canonical artifact addressing ([`CanonicalPath`])
//! - The serialized unit of pipeline output ([`Artifact`]) and its
//!   deferred handle ([`ArtifactLoader`])
//! - The [`DataSource`] contract backends implement
//! - Uniform-grid telemetry series ([`TimeSeries`])
//! - Event windows and ingress targets
//! - Typed TOML configuration for the driver
//!
//! This crate performs no I/O of its own beyond defining the store contract.
//! Backends live in `sunbeam-store`; the stage framework in `sunbeam-stage`.

pub mod artifact;
pub mod config;
pub mod errors;
pub mod event;
pub mod loader;
pub mod path;
pub mod source;
pub mod target;
pub mod time_series;

pub use crate::artifact::{Artifact, FileType, Payload};
pub use crate::errors::{
    ConfigError, DataError, DataResult, PipelineError, StageError, StoreError,
};
pub use crate::event::Event;
pub use crate::loader::ArtifactLoader;
pub use crate::path::CanonicalPath;
pub use crate::source::{DataSource, QueryHints};
pub use crate::target::TimeSeriesTarget;
pub use crate::time_series::TimeSeries;

/// The stage name under which ingress materializes every external artifact.
pub const INGRESS_SOURCE: &str = "ingress";

/// Event component marking an artifact that is not parameterized by event.
pub const EVENT_AGNOSTIC: &str = "all_events";

/// Convenience re-exports.
pub mod prelude {
    pub use crate::artifact::{Artifact, FileType, Payload};
    pub use crate::errors::{
        ConfigError, DataError, DataResult, PipelineError, StageError, StoreError,
    };
    pub use crate::event::Event;
    pub use crate::loader::ArtifactLoader;
    pub use crate::path::CanonicalPath;
    pub use crate::source::{DataSource, QueryHints};
    pub use crate::target::TimeSeriesTarget;
    pub use crate::time_series::TimeSeries;
}
