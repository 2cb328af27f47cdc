//! Construction of the primary (writable) data source from configuration.
//!
//! The primary store backs the Context and must accept writes, so only the
//! filesystem and document backends qualify here. Ingress constructs its
//! own source because it also accepts the read-only kinds.

use std::sync::Arc;

use sunbeam_core::config::DataSourceConfig;
use sunbeam_core::{ConfigError, DataSource, PipelineError};

use crate::document::MongoDataSource;
use crate::fs::FsDataSource;

/// Build the writable primary store described by `config`.
pub fn build_data_source(config: &DataSourceConfig) -> Result<Arc<dyn DataSource>, PipelineError> {
    match config {
        DataSourceConfig::Fs { fs_root, .. } => Ok(Arc::new(FsDataSource::new(fs_root))),
        DataSourceConfig::MongoDb { url, .. } => Ok(Arc::new(MongoDataSource::connect(url)?)),
        DataSourceConfig::InfluxDb { .. } | DataSourceConfig::Sunbeam { .. } => {
            Err(ConfigError::Parse {
                what: "[stage_data_source]".into(),
                message: format!(
                    "{} is read-only and cannot back the pipeline's primary store",
                    config.kind()
                ),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_kinds_cannot_be_primary() {
        let config = DataSourceConfig::Sunbeam {
            api_url: "http://peer".into(),
            ingress_origin: "run0".into(),
        };
        assert!(build_data_source(&config).is_err());
    }

    #[test]
    fn fs_primary_builds() {
        let config = DataSourceConfig::Fs {
            fs_root: "/tmp/sunbeam-test".into(),
            ingress_origin: None,
        };
        assert!(build_data_source(&config).is_ok());
    }
}
