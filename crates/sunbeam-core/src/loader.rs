//! Deferred artifact handles.
//!
//! An [`ArtifactLoader`] is the only currency of inter-stage data passing:
//! a canonical path plus a fetch backing. It never contains raw data and
//! never fails on construction; all fallibility is deferred to [`load`].
//!
//! [`load`]: ArtifactLoader::load

use std::fmt;
use std::sync::Arc;

use crate::artifact::{Artifact, FileType};
use crate::errors::DataResult;
use crate::path::CanonicalPath;
use crate::source::{DataSource, QueryHints};

enum Backing {
    /// Fetch from a shared store handle.
    Store(Arc<dyn DataSource>),
    /// Synthesized handle for a cell no store holds: always yields a
    /// null-data artifact at the canonical path.
    Absent,
}

/// Canonical path plus fetch backing.
#[derive(Clone)]
pub struct ArtifactLoader {
    path: CanonicalPath,
    file_type: FileType,
    backing: Arc<Backing>,
}

impl ArtifactLoader {
    /// A loader that fetches from `source`.
    pub fn bound(path: CanonicalPath, file_type: FileType, source: Arc<dyn DataSource>) -> Self {
        Self {
            path,
            file_type,
            backing: Arc::new(Backing::Store(source)),
        }
    }

    /// A loader to an absent-but-addressable product.
    pub fn absent(path: CanonicalPath, file_type: FileType) -> Self {
        Self {
            path,
            file_type,
            backing: Arc::new(Backing::Absent),
        }
    }

    pub fn canonical_path(&self) -> &CanonicalPath {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Invoke the loader.
    pub fn load(&self) -> DataResult<Artifact> {
        match &*self.backing {
            Backing::Store(source) => source.get(&self.path, &QueryHints::default()),
            Backing::Absent => Ok(Artifact::null(self.path.clone(), self.file_type)),
        }
    }
}

impl fmt::Debug for ArtifactLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backing = match &*self.backing {
            Backing::Store(_) => "store",
            Backing::Absent => "absent",
        };
        f.debug_struct("ArtifactLoader")
            .field("path", &self.path.to_string())
            .field("file_type", &self.file_type)
            .field("backing", &backing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_loader_yields_null_artifact() {
        let path = CanonicalPath::new("run1", "E1", "ingress", "Missing");
        let loader = ArtifactLoader::absent(path.clone(), FileType::TimeSeries);

        let artifact = loader.load().unwrap();
        assert!(artifact.is_null());
        assert_eq!(artifact.canonical_path, path);
        assert_eq!(artifact.file_type, FileType::TimeSeries);
    }
}
