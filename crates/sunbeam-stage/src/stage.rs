//! The stage contract.
//!
//! A stage consumes the loaders its dependencies produced and materializes
//! its declared outputs into the context's primary store, in three phases:
//!
//! - `extract`: invoke the input loaders, tolerating absent inputs
//! - `transform`: pure computation; each output is an independent result,
//!   so a partial failure yields a mix of Ok and Err outputs
//! - `load`: wrap each result as an artifact (null data on Err), store it,
//!   return the loaders
//!
//! [`Stage::run`] drives the phases and enforces the contract: the
//! skip-list short-circuit, dependency discipline at extract time, and
//! output arity. Each phase runs inside its own named tracing span so an
//! orchestrator can observe per-phase status.

use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, DataResult, Payload, PipelineError, StageError,
    StoreError,
};
use tracing::{error, info, info_span, warn};

use crate::context::Context;
use crate::registry::StageDescriptor;

pub trait Stage {
    /// The static descriptor of this stage class.
    fn descriptor(&self) -> &'static StageDescriptor;

    /// The event this instance is processing.
    fn event_name(&self) -> &str;

    /// Invoke the input loaders, yielding raw inputs wrapped in results.
    fn extract(&mut self, inputs: &[ArtifactLoader]) -> Vec<DataResult<Artifact>> {
        inputs.iter().map(ArtifactLoader::load).collect()
    }

    /// Pure computation from extracted inputs to one result per declared
    /// output.
    fn transform(&mut self, extracted: Vec<DataResult<Artifact>>) -> Vec<DataResult<Payload>>;

    /// Wrap each result as an artifact and persist it. The default stores
    /// one artifact per declared output, null data on Err, and logs every
    /// Err with the canonical path of the intended artifact.
    fn load(
        &mut self,
        transformed: Vec<DataResult<Payload>>,
    ) -> Result<Vec<ArtifactLoader>, StoreError> {
        let context = match Context::current() {
            Ok(context) => context,
            Err(_) => {
                return Err(StoreError::Backend {
                    message: "stage ran without an initialized context".into(),
                    source: None,
                })
            }
        };
        let descriptor = self.descriptor();
        let event = self.event_name().to_string();

        let mut loaders = Vec::with_capacity(descriptor.outputs.len());
        for (output, result) in descriptor.outputs.iter().zip(transformed) {
            let path = CanonicalPath::new(context.title(), &event, descriptor.name, output.name);
            let artifact = match result {
                Ok(payload) => {
                    info!(path = %path, "loaded stage output");
                    Artifact::new(path.clone(), payload.file_type(), Some(payload))
                }
                Err(cause) => {
                    error!(path = %path, %cause, "stage output unavailable, storing null artifact");
                    Artifact::null(path.clone(), output.file_type)
                }
            };
            loaders.push(context.data_source().store(artifact)?);
        }
        Ok(loaders)
    }

    /// Materialize null-data artifacts at every declared output path, used
    /// in place of the three phases when this stage is skipped.
    fn skip(&self) -> Result<Vec<ArtifactLoader>, StoreError> {
        let context = match Context::current() {
            Ok(context) => context,
            Err(_) => {
                return Err(StoreError::Backend {
                    message: "stage skipped without an initialized context".into(),
                    source: None,
                })
            }
        };
        let descriptor = self.descriptor();
        warn!(stage = descriptor.name, "stage is being skipped");

        descriptor
            .outputs
            .iter()
            .map(|output| {
                let path = CanonicalPath::new(
                    context.title(),
                    self.event_name(),
                    descriptor.name,
                    output.name,
                );
                context
                    .data_source()
                    .store(Artifact::null(path, output.file_type))
            })
            .collect()
    }

    /// The public entry point: skip-list check, dependency discipline,
    /// extract, transform, load, output arity.
    fn run(&mut self, inputs: &[ArtifactLoader]) -> Result<Vec<ArtifactLoader>, PipelineError> {
        let descriptor = self.descriptor();
        let context = Context::current()?;
        context.registry().get(descriptor.name)?;

        if context.should_skip(descriptor.name) {
            return Ok(self.skip()?);
        }

        for input in inputs {
            let source = input.canonical_path().source();
            if !descriptor.depends_on(source) {
                return Err(StageError::UndeclaredDependency {
                    stage: descriptor.name.to_string(),
                    origin: source.to_string(),
                }
                .into());
            }
        }

        let extracted = info_span!("extract", stage = descriptor.name)
            .in_scope(|| self.extract(inputs));
        let transformed = info_span!("transform", stage = descriptor.name)
            .in_scope(|| self.transform(extracted));

        if transformed.len() != descriptor.outputs.len() {
            return Err(StageError::OutputArity {
                stage: descriptor.name.to_string(),
                produced: transformed.len(),
                declared: descriptor.outputs.len(),
            }
            .into());
        }

        let loaded =
            info_span!("load", stage = descriptor.name).in_scope(|| self.load(transformed))?;

        if loaded.len() != descriptor.outputs.len() {
            return Err(StageError::OutputArity {
                stage: descriptor.name.to_string(),
                produced: loaded.len(),
                declared: descriptor.outputs.len(),
            }
            .into());
        }
        Ok(loaded)
    }
}

/// Unwrap a time-series input extracted from a dependency, translating
/// every flavor of absence into a recoverable [`DataError`].
///
/// [`DataError`]: sunbeam_core::DataError
pub fn time_series_input(
    result: DataResult<Artifact>,
    name: &str,
) -> DataResult<sunbeam_core::TimeSeries> {
    use sunbeam_core::DataError;

    let artifact = result?;
    match artifact.data {
        Some(Payload::TimeSeries(series)) => Ok(series),
        Some(other) => Err(DataError::Unavailable {
            name: name.to_string(),
            reason: format!("expected a time series, found {}", other.file_type()),
        }),
        None => Err(DataError::Unavailable {
            name: name.to_string(),
            reason: "artifact holds no data".to_string(),
        }),
    }
}
