//! Namespace-collision policy: ingress in Existing mode with a writable
//! backend must not read the tree the pipeline is writing. The violation is
//! rejected at construction, before any cell is touched.

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use sunbeam_core::config::DataSourceConfig;
use sunbeam_core::{ConfigError, PipelineError};
use sunbeam_stage::{builtin_registry, Context, IngressStage};
use sunbeam_store::FsDataSource;

#[test]
fn ingress_origin_equal_to_title_is_rejected_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    Context::initialize(
        "run1",
        Arc::new(FsDataSource::new(dir.path().join("primary"))),
        BTreeSet::new(),
        builtin_registry(),
        dir.path().join("stage_data"),
    )
    .unwrap();

    let colliding = DataSourceConfig::Fs {
        fs_root: dir.path().join("upstream").display().to_string(),
        ingress_origin: Some("run1".to_string()),
    };
    assert_matches!(
        IngressStage::new(&colliding),
        Err(PipelineError::Config(ConfigError::IngressOriginCollision { origin })) if origin == "run1"
    );

    // A writable ingress source with no origin at all is equally unusable.
    let missing = DataSourceConfig::Fs {
        fs_root: dir.path().join("upstream").display().to_string(),
        ingress_origin: None,
    };
    assert_matches!(
        IngressStage::new(&missing),
        Err(PipelineError::Config(ConfigError::MissingKey { .. }))
    );

    // The document store enforces the same policy, before any connection
    // is attempted.
    let document = DataSourceConfig::MongoDb {
        ingress_origin: "run1".to_string(),
        url: "mongodb://mongodb:27017/".to_string(),
    };
    assert_matches!(
        IngressStage::new(&document),
        Err(PipelineError::Config(ConfigError::IngressOriginCollision { origin })) if origin == "run1"
    );

    // A different origin passes the policy check.
    let fine = DataSourceConfig::Fs {
        fs_root: dir.path().join("upstream").display().to_string(),
        ingress_origin: Some("run0".to_string()),
    };
    assert!(IngressStage::new(&fine).is_ok());
}
