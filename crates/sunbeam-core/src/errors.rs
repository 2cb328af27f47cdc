//! Error taxonomy for Sunbeam.
//!
//! Four reified classes, matching how failures propagate:
//! - [`ConfigError`]: fatal at startup, before any stage runs
//! - [`StageError`]: a stage contract violation, fatal to the run
//! - [`DataError`]: per-artifact recoverable failure; only ever travels
//!   inside a [`DataResult`], never across a stage boundary
//! - [`StoreError`]: unrecoverable backend infrastructure failure
//!
//! [`PipelineError`] is the driver-facing umbrella for the fatal classes.

use crate::path::CanonicalPath;

/// Boxed dynamic cause, used wherever an error wraps a backend failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The currency of extract/transform outputs: a value or a recoverable
/// per-artifact failure.
pub type DataResult<T> = Result<T, DataError>;

/// Fatal configuration problems, surfaced before the pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required key `{key}` in {section}")]
    MissingKey { section: String, key: String },

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("target names must be unique: `{name}` is already the name of another target")]
    DuplicateTarget { name: String },

    #[error("no targets were declared in the ingress description")]
    NoTargets,

    #[error("no events were declared; at least one event must be declared")]
    NoEvents,

    #[error("ingress of `{kind}` targets is not implemented")]
    UnsupportedTargetKind { kind: String },

    #[error("target `{name}` declares a non-positive frequency ({frequency} Hz)")]
    InvalidFrequency { name: String, frequency: f64 },

    #[error("unrecognized data source type `{kind}`")]
    UnknownDataSourceType { kind: String },

    #[error("stage `{name}` is not registered")]
    UnregisteredStage { name: String },

    #[error("stage `{name}` is already registered with a different descriptor")]
    ConflictingRegistration { name: String },

    #[error("stage dependency graph contains a cycle through `{stage}`")]
    DependencyCycle { stage: String },

    #[error("context has already been initialized")]
    ContextAlreadyInitialized,

    #[error("context has not been initialized yet")]
    ContextNotInitialized,

    #[error(
        "ingress origin `{origin}` collides with the pipeline title; \
         ingress must copy from a different origin than the one it writes to"
    )]
    IngressOriginCollision { origin: String },
}

/// Stage API contract violations. These abort the run: they indicate a bug
/// in the pipeline wiring, not bad telemetry.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(
        "stage `{stage}` received an input produced by `{origin}`, \
         which is not among its declared dependencies"
    )]
    UndeclaredDependency { stage: String, origin: String },

    #[error("stage `{stage}` produced {produced} outputs but declares {declared}")]
    OutputArity {
        stage: String,
        produced: usize,
        declared: usize,
    },

    #[error("stage `{stage}` misused the stage API: {message}")]
    ApiMisuse { stage: String, message: String },
}

/// Recoverable per-artifact failures. A stage that hits one of these emits a
/// null-data artifact at the intended canonical path and carries on.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("artifact not found at {path}")]
    NotFound { path: CanonicalPath },

    #[error("query for {path} failed")]
    Query {
        path: CanonicalPath,
        #[source]
        source: BoxError,
    },

    #[error("failed to decode artifact at {path}")]
    Decode {
        path: CanonicalPath,
        #[source]
        source: BoxError,
    },

    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("input `{name}` is unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

impl DataError {
    /// Wrap an arbitrary backend failure as a query error against `path`.
    pub fn query(path: CanonicalPath, source: impl Into<BoxError>) -> Self {
        Self::Query {
            path,
            source: source.into(),
        }
    }

    /// Wrap a deserialization failure for the artifact at `path`.
    pub fn decode(path: CanonicalPath, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            path,
            source: source.into(),
        }
    }
}

/// Unrecoverable backend failures. `store` fails only on these; a backend
/// that cannot persist an artifact cannot be trusted to hold the run.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("`store` is not allowed: {backend} is read-only")]
    NotAllowed { backend: &'static str },

    #[error("I/O failure in artifact store")]
    Io(#[from] std::io::Error),

    #[error("artifact store backend failure: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StoreError {
    pub fn backend(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Umbrella over the fatal error classes, as seen by the pipeline driver.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_carries_cause_chain() {
        let path = CanonicalPath::new("run1", "E1", "ingress", "T1");
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = DataError::query(path, io);

        let mut chain = 0;
        let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(e) = cur {
            chain += 1;
            cur = e.source();
        }
        assert_eq!(chain, 2, "query error should wrap exactly one cause");
    }

    #[test]
    fn pipeline_error_is_built_from_each_fatal_class() {
        let e: PipelineError = ConfigError::NoEvents.into();
        assert!(matches!(e, PipelineError::Config(_)));

        let e: PipelineError = StageError::OutputArity {
            stage: "power".into(),
            produced: 1,
            declared: 2,
        }
        .into();
        assert!(matches!(e, PipelineError::Stage(_)));

        let e: PipelineError = StoreError::NotAllowed {
            backend: "InfluxDataSource",
        }
        .into();
        assert!(matches!(e, PipelineError::Store(_)));
    }

    #[test]
    fn unavailable_inputs_render_their_reason() {
        let err = DataError::Unavailable {
            name: "pack_power".into(),
            reason: "artifact holds no data".into(),
        };
        assert_eq!(
            err.to_string(),
            "input `pack_power` is unavailable: artifact holds no data"
        );
    }
}
