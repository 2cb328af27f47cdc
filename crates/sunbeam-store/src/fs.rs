//! Filesystem-backed artifact store.
//!
//! Maps `origin/event/source/name` to `<root>/origin/event/source/name.bin`,
//! one self-describing CBOR blob per artifact. Writes create parent
//! directories on demand and replace any previous blob at the path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, DataError, DataResult, DataSource, QueryHints,
    StoreError,
};

#[derive(Clone)]
pub struct FsDataSource {
    root: PathBuf,
}

impl FsDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn real_path(&self, path: &CanonicalPath) -> PathBuf {
        // Appended rather than set_extension: artifact names may contain
        // dots of their own.
        let mut real = self.root.join(path.to_relative_path());
        real.set_file_name(format!("{}.bin", path.name()));
        real
    }

    fn checked_real_path(&self, path: &CanonicalPath) -> Result<PathBuf, StoreError> {
        if !path.is_fs_safe() {
            return Err(StoreError::Backend {
                message: format!("canonical path `{path}` is not usable as a file path"),
                source: None,
            });
        }
        Ok(self.real_path(path))
    }
}

impl DataSource for FsDataSource {
    fn store(&self, artifact: Artifact) -> Result<ArtifactLoader, StoreError> {
        let real = self.checked_real_path(&artifact.canonical_path)?;
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)?;
        }

        // Null-data artifacts are written too: the product is absent but
        // must remain addressable.
        let bytes = artifact.encode()?;
        fs::write(&real, bytes)?;
        debug!(path = %artifact.canonical_path, file = %real.display(), "stored artifact");

        Ok(ArtifactLoader::bound(
            artifact.canonical_path.clone(),
            artifact.file_type,
            Arc::new(self.clone()),
        ))
    }

    fn get(&self, path: &CanonicalPath, _hints: &QueryHints) -> DataResult<Artifact> {
        if !path.is_fs_safe() {
            return Err(DataError::NotFound { path: path.clone() });
        }
        let real = self.real_path(path);
        let bytes = match fs::read(&real) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::NotFound { path: path.clone() })
            }
            Err(e) => return Err(DataError::query(path.clone(), e)),
        };
        Artifact::decode(&bytes, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sunbeam_core::{FileType, Payload, TimeSeries};
    use time::macros::datetime;

    fn artifact(name: &str, values: Vec<f64>) -> Artifact {
        let ts = TimeSeries::from_values(
            name,
            "A",
            1.0,
            datetime!(2024-07-16 17:00:00 UTC),
            values,
        );
        Artifact::new(
            CanonicalPath::new("run1", "E1", "ingress", name),
            FileType::TimeSeries,
            Some(Payload::TimeSeries(ts)),
        )
    }

    #[test]
    fn store_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDataSource::new(dir.path());

        let a = artifact("PackCurrent", vec![1.0, 2.0, 3.0]);
        let loader = store.store(a.clone()).unwrap();

        assert!(dir
            .path()
            .join("run1/E1/ingress/PackCurrent.bin")
            .exists());
        assert_eq!(loader.load().unwrap(), a);
    }

    #[test]
    fn second_store_at_same_path_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDataSource::new(dir.path());

        store.store(artifact("PackCurrent", vec![1.0])).unwrap();
        let replacement = artifact("PackCurrent", vec![9.0, 9.0]);
        store.store(replacement.clone()).unwrap();

        let got = store
            .get(&replacement.canonical_path, &QueryHints::default())
            .unwrap();
        assert_eq!(got, replacement);
    }

    #[test]
    fn null_data_artifacts_occupy_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDataSource::new(dir.path());

        let path = CanonicalPath::new("run1", "E1", "power", "pack_power");
        store
            .store(Artifact::null(path.clone(), FileType::TimeSeries))
            .unwrap();

        let got = store.get(&path, &QueryHints::default()).unwrap();
        assert!(got.is_null());
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDataSource::new(dir.path());
        let path = CanonicalPath::new("run1", "E1", "ingress", "Nope");
        assert_matches!(
            store.get(&path, &QueryHints::default()),
            Err(DataError::NotFound { .. })
        );
    }

    #[test]
    fn traversal_components_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDataSource::new(dir.path());
        let evil = Artifact::null(
            CanonicalPath::new("..", "E1", "ingress", "x"),
            FileType::TimeSeries,
        );
        assert!(store.store(evil).is_err());
    }
}
