//! Dependency discipline: a loader whose source is not among a stage's
//! declared dependencies is rejected at run time, before any phase runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, DataResult, DataSource, FileType, Payload,
    PipelineError, StageError,
};
use sunbeam_stage::{builtin_registry, Context, Stage, StageDescriptor};
use sunbeam_store::FsDataSource;

static LONER_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: "loner",
    dependencies: &[],
    outputs: &[],
};

/// A stage with no declared dependencies at all.
struct LonerStage;

impl Stage for LonerStage {
    fn descriptor(&self) -> &'static StageDescriptor {
        &LONER_DESCRIPTOR
    }

    fn event_name(&self) -> &str {
        "E1"
    }

    fn transform(&mut self, _extracted: Vec<DataResult<Artifact>>) -> Vec<DataResult<Payload>> {
        Vec::new()
    }
}

#[test]
fn loader_from_undeclared_source_raises_stage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDataSource::new(dir.path()));

    let mut registry = builtin_registry();
    registry.register(&LONER_DESCRIPTOR).unwrap();
    Context::initialize(
        "run1",
        store.clone(),
        BTreeSet::new(),
        registry,
        dir.path().join("stage_data"),
    )
    .unwrap();

    // A real, loadable artifact whose source is ingress.
    let ingress_loader = store
        .as_ref()
        .store(Artifact::null(
            CanonicalPath::new("run1", "E1", "ingress", "PackCurrent"),
            FileType::TimeSeries,
        ))
        .unwrap();

    let mut stage = LonerStage;
    let err = stage.run(&[ingress_loader]).unwrap_err();
    assert_matches!(
        err,
        PipelineError::Stage(StageError::UndeclaredDependency { stage, origin })
            if stage == "loner" && origin == "ingress"
    );

    // Synthesized absent loaders carry a source too and get the same
    // treatment.
    let absent = ArtifactLoader::absent(
        CanonicalPath::new("run1", "E1", "ingress", "Ghost"),
        FileType::TimeSeries,
    );
    let err = stage.run(&[absent]).unwrap_err();
    assert_matches!(err, PipelineError::Stage(StageError::UndeclaredDependency { .. }));

    // With no inputs the stage runs fine and produces its (empty) outputs.
    let outputs = stage.run(&[]).unwrap();
    assert!(outputs.is_empty());
}
