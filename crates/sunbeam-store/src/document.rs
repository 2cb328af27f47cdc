//! Document-store backend (MongoDB).
//!
//! One logical collection holds one document per artifact, keyed by the
//! canonical four-tuple under a unique compound index. Stores are
//! upsert-replace: a collision overwrites the entire document. The payload
//! travels as an opaque CBOR blob in the `data` field; the remaining
//! artifact fields are stored alongside it.
//!
//! On first connection a `metadata` collection records initialization
//! status so that operators can distinguish an empty database from an
//! uninitialized one.

use std::sync::Arc;

use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;
use tracing::info;

use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, DataError, DataResult, DataSource, FileType, Payload,
    QueryHints, StoreError,
};

const DATABASE: &str = "sunbeam_db";
const ARTIFACTS: &str = "time_series_data";
const METADATA: &str = "metadata";

#[derive(Clone)]
pub struct MongoDataSource {
    artifacts: Collection<Document>,
}

impl MongoDataSource {
    /// Connect, initialize the metadata collection if this is a fresh
    /// database, and ensure the unique compound index exists.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(url)
            .map_err(|e| StoreError::backend("failed to connect to document store", e))?;
        let db = client.database(DATABASE);

        let metadata: Collection<Document> = db.collection(METADATA);
        let status = metadata
            .find_one(doc! { "type": "status" })
            .run()
            .map_err(|e| StoreError::backend("failed to read document store status", e))?;

        if status.is_none() {
            info!("document store is not initialized, initializing");
            metadata
                .insert_one(doc! { "type": "status" })
                .run()
                .map_err(|e| StoreError::backend("failed to initialize document store", e))?;
            metadata
                .insert_one(doc! { "type": "commissioned_pipelines", "data": [] })
                .run()
                .map_err(|e| StoreError::backend("failed to initialize document store", e))?;
        }

        let artifacts: Collection<Document> = db.collection(ARTIFACTS);
        let index = IndexModel::builder()
            .keys(doc! { "origin": 1, "event": 1, "source": 1, "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        artifacts
            .create_index(index)
            .run()
            .map_err(|e| StoreError::backend("failed to create artifact index", e))?;

        info!(url, "connection to document store initialized");
        Ok(Self { artifacts })
    }

    fn key(path: &CanonicalPath) -> Document {
        let (origin, event, source, name) = path.unpack();
        doc! { "origin": origin, "event": event, "source": source, "name": name }
    }
}

impl DataSource for MongoDataSource {
    fn store(&self, artifact: Artifact) -> Result<ArtifactLoader, StoreError> {
        let data = match &artifact.data {
            Some(payload) => {
                let mut blob = Vec::new();
                ciborium::ser::into_writer(payload, &mut blob)
                    .map_err(|e| StoreError::backend("failed to encode payload", e))?;
                Bson::Binary(Binary {
                    subtype: BinarySubtype::Generic,
                    bytes: blob,
                })
            }
            None => Bson::Null,
        };

        let mut replacement = Self::key(&artifact.canonical_path);
        replacement.insert("data", data);
        replacement.insert("filetype", artifact.file_type.as_str());
        replacement.insert(
            "description",
            artifact.description.clone().unwrap_or_default(),
        );
        let metadata: Document = artifact
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Bson::String(v.clone())))
            .collect();
        replacement.insert("metadata", metadata);

        self.artifacts
            .replace_one(Self::key(&artifact.canonical_path), replacement)
            .upsert(true)
            .run()
            .map_err(|e| StoreError::backend("failed to store artifact document", e))?;

        Ok(ArtifactLoader::bound(
            artifact.canonical_path.clone(),
            artifact.file_type,
            Arc::new(self.clone()),
        ))
    }

    fn get(&self, path: &CanonicalPath, _hints: &QueryHints) -> DataResult<Artifact> {
        let document = self
            .artifacts
            .find_one(Self::key(path))
            .run()
            .map_err(|e| DataError::query(path.clone(), e))?
            .ok_or_else(|| DataError::NotFound { path: path.clone() })?;

        let file_type = document
            .get_str("filetype")
            .ok()
            .and_then(FileType::parse)
            .unwrap_or(FileType::TimeSeries);

        let data = match document.get("data") {
            Some(Bson::Binary(binary)) => Some(
                ciborium::de::from_reader::<Payload, _>(binary.bytes.as_slice())
                    .map_err(|e| DataError::decode(path.clone(), e))?,
            ),
            _ => None,
        };

        let description = document
            .get_str("description")
            .ok()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let metadata = document
            .get_document("metadata")
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let mut artifact = Artifact::new(path.clone(), file_type, data);
        artifact.description = description;
        artifact.metadata = metadata;
        Ok(artifact)
    }
}
