//! The run-scoped context.
//!
//! Exactly one [`Context`] exists per process. It is written once by the
//! driver before any stage is constructed, and read-only for the rest of
//! the run: the pipeline title, the writable primary store, the set of
//! stages to skip, the stage registry, and the static stage-data root.
//!
//! Stages do not take a context argument; they acquire it at construction
//! via [`Context::current`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use sunbeam_core::{ConfigError, DataSource};

use crate::registry::StageRegistry;

static CONTEXT: OnceLock<Context> = OnceLock::new();

pub struct Context {
    title: String,
    data_source: Arc<dyn DataSource>,
    stages_to_skip: BTreeSet<String>,
    registry: StageRegistry,
    stage_data_root: PathBuf,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("title", &self.title)
            .field("stages_to_skip", &self.stages_to_skip)
            .field("stage_data_root", &self.stage_data_root)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Install the process-wide context. Fails if one already exists.
    pub fn initialize(
        title: impl Into<String>,
        data_source: Arc<dyn DataSource>,
        stages_to_skip: BTreeSet<String>,
        registry: StageRegistry,
        stage_data_root: impl Into<PathBuf>,
    ) -> Result<&'static Context, ConfigError> {
        let context = Context {
            title: title.into(),
            data_source,
            stages_to_skip,
            registry,
            stage_data_root: stage_data_root.into(),
        };
        CONTEXT
            .set(context)
            .map_err(|_| ConfigError::ContextAlreadyInitialized)?;
        Ok(CONTEXT.get().ok_or(ConfigError::ContextNotInitialized)?)
    }

    /// The installed context, if the driver has initialized one.
    pub fn current() -> Result<&'static Context, ConfigError> {
        CONTEXT.get().ok_or(ConfigError::ContextNotInitialized)
    }

    pub fn is_initialized() -> bool {
        CONTEXT.get().is_some()
    }

    /// The pipeline title: the origin of everything this run produces.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The writable store stages load into.
    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    pub fn should_skip(&self, stage_name: &str) -> bool {
        self.stages_to_skip.contains(stage_name)
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn stage_data_root(&self) -> &Path {
        &self.stage_data_root
    }
}
