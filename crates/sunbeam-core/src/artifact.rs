//! The serialized unit of pipeline output.
//!
//! An [`Artifact`] couples a payload with its canonical address, a type tag,
//! and free-form metadata. `data` may be `None`: a known-absent product is
//! still stored so that it remains addressable by downstream stages.
//!
//! The wire form is self-describing CBOR of the whole artifact, so a blob
//! read back from any backend reconstructs the full wrapper, not just the
//! payload.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DataError, DataResult, StoreError};
use crate::path::CanonicalPath;
use crate::time_series::TimeSeries;

/// Artifact payload type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    TimeSeries,
    Scalar,
    DataFrame,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeSeries => "TimeSeries",
            Self::Scalar => "Scalar",
            Self::DataFrame => "DataFrame",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TimeSeries" => Some(Self::TimeSeries),
            "Scalar" => Some(Self::Scalar),
            "DataFrame" => Some(Self::DataFrame),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact payload, matching the [`FileType`] tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    TimeSeries(TimeSeries),
    Scalar(f64),
    DataFrame(BTreeMap<String, Vec<f64>>),
}

impl Payload {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::TimeSeries(_) => FileType::TimeSeries,
            Self::Scalar(_) => FileType::Scalar,
            Self::DataFrame(_) => FileType::DataFrame,
        }
    }

    pub fn as_time_series(&self) -> Option<&TimeSeries> {
        match self {
            Self::TimeSeries(ts) => Some(ts),
            _ => None,
        }
    }
}

/// Data plus canonical path plus type tag plus description plus metadata.
///
/// Two stores of artifacts sharing a canonical path replace one another;
/// the path uniquely identifies the artifact within its store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub canonical_path: CanonicalPath,
    pub file_type: FileType,
    pub data: Option<Payload>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(canonical_path: CanonicalPath, file_type: FileType, data: Option<Payload>) -> Self {
        Self {
            canonical_path,
            file_type,
            data,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    /// A known-absent product at `canonical_path`.
    pub fn null(canonical_path: CanonicalPath, file_type: FileType) -> Self {
        Self::new(canonical_path, file_type, None)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Re-address this artifact, keeping payload and metadata.
    pub fn readdressed(mut self, canonical_path: CanonicalPath) -> Self {
        self.canonical_path = canonical_path;
        self
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Encode the full artifact as a self-describing CBOR blob.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| StoreError::backend("failed to encode artifact", e))?;
        Ok(buf)
    }

    /// Decode an artifact blob read back from a store. `path` names the
    /// intended address for error reporting only; the decoded artifact
    /// carries its own canonical path.
    pub fn decode(bytes: &[u8], path: &CanonicalPath) -> DataResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| DataError::decode(path.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn series_artifact() -> Artifact {
        let ts = TimeSeries::from_values(
            "PackCurrent",
            "A",
            1.0,
            datetime!(2024-07-16 17:00:00 UTC),
            vec![1.0, 2.0, 3.0],
        );
        Artifact::new(
            CanonicalPath::new("run1", "E1", "ingress", "PackCurrent"),
            FileType::TimeSeries,
            Some(Payload::TimeSeries(ts)),
        )
        .with_description("pack current")
    }

    #[test]
    fn cbor_roundtrip_preserves_the_wrapper() {
        let artifact = series_artifact();
        let bytes = artifact.encode().unwrap();
        let decoded = Artifact::decode(&bytes, &artifact.canonical_path).unwrap();
        assert_eq!(decoded, artifact);
    }

    #[test]
    fn null_artifacts_roundtrip() {
        let artifact = Artifact::null(
            CanonicalPath::new("run1", "E1", "power", "pack_power"),
            FileType::TimeSeries,
        );
        let bytes = artifact.encode().unwrap();
        let decoded = Artifact::decode(&bytes, &artifact.canonical_path).unwrap();
        assert!(decoded.is_null());
        assert_eq!(decoded, artifact);
    }

    #[test]
    fn garbage_bytes_decode_to_data_error() {
        let path = CanonicalPath::new("run1", "E1", "ingress", "x");
        let err = Artifact::decode(b"not cbor at all", &path).unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
    }
}
