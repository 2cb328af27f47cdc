//! Remote-peer backend: artifacts served by another Sunbeam instance.
//!
//! Read-only. A fetch resolves to
//! `GET {api_url}/files/{origin}/{event}/{source}/{name}` and the body is
//! the same self-describing CBOR blob the filesystem backend writes. The
//! configured ingress origin substitutes the path origin, so a peer source
//! always reads from the pipeline tree it was configured for.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::debug;

use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, ConfigError, DataError, DataResult, DataSource,
    QueryHints, StoreError,
};

pub struct PeerDataSource {
    client: Client,
    api_url: String,
    origin: String,
}

impl PeerDataSource {
    pub fn new(api_url: &str, ingress_origin: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ConfigError::Parse {
                what: "peer HTTP client".into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            origin: ingress_origin.to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl DataSource for PeerDataSource {
    fn store(&self, _artifact: Artifact) -> Result<ArtifactLoader, StoreError> {
        Err(StoreError::NotAllowed {
            backend: "PeerDataSource",
        })
    }

    fn get(&self, path: &CanonicalPath, _hints: &QueryHints) -> DataResult<Artifact> {
        let (_, event, source, name) = path.unpack();
        let url = format!(
            "{}/files/{}/{}/{}/{}",
            self.api_url, self.origin, event, source, name
        );
        debug!(%path, %url, "fetching artifact from peer");

        let response = self.client.get(&url).send().map_err(|e| DataError::Network {
            message: format!("peer fetch for {path} failed"),
            source: Some(Box::new(e)),
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DataError::NotFound { path: path.clone() }),
            status if !status.is_success() => Err(DataError::query(
                path.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("peer returned {status}"),
                ),
            )),
            _ => {
                let bytes = response.bytes().map_err(|e| DataError::Network {
                    message: format!("failed to read peer response for {path}"),
                    source: Some(Box::new(e)),
                })?;
                Artifact::decode(&bytes, path)
            }
        }
    }
}
