//! The store contract backends implement.
//!
//! A [`DataSource`] persists artifacts under their canonical paths and
//! retrieves them. `store` is idempotent-with-replace on path collisions and
//! fails only on infrastructure problems; a null-data artifact is recorded
//! like any other so absent products stay addressable. `get` returns a
//! recoverable [`DataError`] when the artifact cannot be produced.
//!
//! Implementations must be callable from the ingress worker pool.

use time::OffsetDateTime;

use crate::artifact::Artifact;
use crate::errors::{DataResult, StoreError};
use crate::loader::ArtifactLoader;
use crate::path::CanonicalPath;

/// Optional retrieval hints. Only the upstream telemetry backend reads
/// these; addressable stores ignore them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueryHints {
    pub start: Option<OffsetDateTime>,
    pub stop: Option<OffsetDateTime>,
    /// Hours added to both window bounds, accommodating clock skew between
    /// the telemetry logger and the event description.
    pub offset_hours: Option<f64>,
}

impl QueryHints {
    pub fn window(start: OffsetDateTime, stop: OffsetDateTime, offset_hours: Option<f64>) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            offset_hours,
        }
    }
}

/// Polymorphic artifact store.
pub trait DataSource: Send + Sync {
    /// Persist `artifact` under its canonical path, replacing any previous
    /// contents at that path, and return a loader bound to the same path
    /// and this store.
    fn store(&self, artifact: Artifact) -> Result<ArtifactLoader, StoreError>;

    /// Retrieve the artifact at `path`.
    fn get(&self, path: &CanonicalPath, hints: &QueryHints) -> DataResult<Artifact>;
}
