//! The context is a process-wide singleton: absent until the driver
//! installs it, and installable exactly once.

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use sunbeam_core::ConfigError;
use sunbeam_stage::{builtin_registry, Context};
use sunbeam_store::FsDataSource;

#[test]
fn context_initializes_exactly_once_per_process() {
    assert_matches!(Context::current(), Err(ConfigError::ContextNotInitialized));
    assert!(!Context::is_initialized());

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDataSource::new(dir.path()));

    let context = Context::initialize(
        "run1",
        store.clone(),
        BTreeSet::new(),
        builtin_registry(),
        dir.path().join("stage_data"),
    )
    .unwrap();
    assert_eq!(context.title(), "run1");
    assert!(Context::is_initialized());
    assert!(Context::current().is_ok());

    let second = Context::initialize(
        "run2",
        store,
        BTreeSet::new(),
        builtin_registry(),
        dir.path().join("stage_data"),
    );
    assert_matches!(second, Err(ConfigError::ContextAlreadyInitialized));

    // The original installation is untouched.
    assert_eq!(Context::current().unwrap().title(), "run1");
}
