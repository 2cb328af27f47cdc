//! The ingress stage: the bridge from external telemetry into the internal
//! artifact namespace.
//!
//! Ingress has no dependencies and runs once per pipeline, fanning out over
//! every (event, target) cell. Each cell yields exactly one loader: either
//! to a real time series or to a null-data artifact at the same canonical
//! path. One bad cell never aborts its siblings.
//!
//! The mode is fixed at construction from the ingress data-source
//! configuration:
//! - **Upstream**: query the telemetry database per cell over a bounded
//!   worker pool, resample onto the target grid, store under
//!   `(title, event, "ingress", target.name)`.
//! - **Existing**: read `(origin, event, "ingress", target.field)` from a
//!   previously materialized tree and re-store under the pipeline title —
//!   an explicit copy, never a rename, so every pipeline owns a
//!   self-contained tree. With a writable backend the source origin must
//!   differ from the pipeline title, otherwise the pipeline could read
//!   through its own unbuilt outputs.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{error, info, info_span, warn};

use sunbeam_core::config::DataSourceConfig;
use sunbeam_core::time_series::Sample;
use sunbeam_core::{
    Artifact, ArtifactLoader, CanonicalPath, ConfigError, DataError, DataResult, DataSource,
    Event, FileType, Payload, PipelineError, QueryHints, TimeSeries, TimeSeriesTarget,
    INGRESS_SOURCE,
};
use sunbeam_store::upstream::{QUERY_TIME_COLUMN, QUERY_VALUE_COLUMN};
use sunbeam_store::{FsDataSource, InfluxDataSource, MongoDataSource, PeerDataSource};

use crate::context::Context;
use crate::registry::StageDescriptor;

pub static INGRESS_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: INGRESS_SOURCE,
    dependencies: &[],
    // Outputs are data-driven: one per configured target per event.
    outputs: &[],
};

enum IngressMode {
    Upstream {
        source: InfluxDataSource,
        workers: usize,
    },
    Existing {
        source: Arc<dyn DataSource>,
        origin: String,
    },
}

pub struct IngressStage {
    context: &'static Context,
    mode: IngressMode,
}

impl std::fmt::Debug for IngressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressStage").finish_non_exhaustive()
    }
}

/// The nested view ingress returns: event name → target name → loader.
///
/// Lookups never fail. An unknown event yields an empty per-event view; an
/// unknown target within a known event yields a loader to an
/// absent-but-addressable artifact at the canonical path it would have had.
pub struct IngressView {
    origin: String,
    cells: IndexMap<String, IndexMap<String, ArtifactLoader>>,
}

impl IngressView {
    fn empty(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            cells: IndexMap::new(),
        }
    }

    /// The loader for one (event, target) cell.
    pub fn get(&self, event: &str, target: &str) -> ArtifactLoader {
        self.cells
            .get(event)
            .and_then(|targets| targets.get(target))
            .cloned()
            .unwrap_or_else(|| {
                ArtifactLoader::absent(
                    CanonicalPath::new(&self.origin, event, INGRESS_SOURCE, target),
                    FileType::TimeSeries,
                )
            })
    }

    /// A view over one event's cells; empty for unknown events.
    pub fn event<'a>(&'a self, event: &'a str) -> EventView<'a> {
        EventView { view: self, event }
    }

    /// Event names in input order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

/// One event's slice of an [`IngressView`].
pub struct EventView<'a> {
    view: &'a IngressView,
    event: &'a str,
}

impl EventView<'_> {
    pub fn get(&self, target: &str) -> ArtifactLoader {
        self.view.get(self.event, target)
    }

    /// Target names materialized for this event, in input order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.view
            .cells
            .get(self.event)
            .into_iter()
            .flat_map(|targets| targets.keys().map(String::as_str))
    }
}

impl IngressStage {
    /// Build the ingress stage for the configured data source. Policy
    /// violations (a writable source reading the pipeline's own tree) are
    /// rejected here, before any cell is touched.
    pub fn new(config: &DataSourceConfig) -> Result<Self, PipelineError> {
        let context = Context::current()?;
        context.registry().get(INGRESS_SOURCE)?;

        let mode = match config {
            DataSourceConfig::Fs {
                fs_root,
                ingress_origin,
            } => {
                let origin =
                    ingress_origin
                        .clone()
                        .ok_or_else(|| ConfigError::MissingKey {
                            section: "ingress_data_source".into(),
                            key: "ingress_origin".into(),
                        })?;
                reject_own_tree(&origin, context)?;
                IngressMode::Existing {
                    source: Arc::new(FsDataSource::new(fs_root)),
                    origin,
                }
            }
            DataSourceConfig::MongoDb { ingress_origin, url } => {
                reject_own_tree(ingress_origin, context)?;
                IngressMode::Existing {
                    source: Arc::new(MongoDataSource::connect(url)?),
                    origin: ingress_origin.clone(),
                }
            }
            DataSourceConfig::InfluxDb {
                start,
                stop,
                url,
                workers,
            } => IngressMode::Upstream {
                source: InfluxDataSource::new(url, start, stop)?,
                workers: (*workers).max(1),
            },
            DataSourceConfig::Sunbeam {
                api_url,
                ingress_origin,
            } => {
                // Peers are read-only; the origin may legitimately match.
                IngressMode::Existing {
                    source: Arc::new(PeerDataSource::new(api_url, ingress_origin)?),
                    origin: ingress_origin.clone(),
                }
            }
        };

        Ok(Self { context, mode })
    }

    /// Run ingress over every (event, target) cell.
    pub fn run(
        &self,
        targets: &[TimeSeriesTarget],
        events: &[Event],
        targets_to_skip: &BTreeSet<String>,
    ) -> Result<IngressView, PipelineError> {
        if self.context.should_skip(INGRESS_SOURCE) {
            warn!(stage = INGRESS_SOURCE, "stage is being skipped");
            return Ok(IngressView::empty(self.context.title()));
        }

        let span = info_span!("ingress", events = events.len(), targets = targets.len());
        let _guard = span.enter();

        let extracted = info_span!("extract", stage = INGRESS_SOURCE)
            .in_scope(|| self.extract_cells(targets, events, targets_to_skip));

        // Transform happened cell-wise during extraction; loading stores
        // every cell, in input order, under the pipeline title.
        info_span!("load", stage = INGRESS_SOURCE).in_scope(|| self.load_cells(extracted))
    }

    /// Fetch every cell. Upstream mode fans out across the worker pool;
    /// per-cell order of the returned rows is input order regardless of
    /// completion order.
    fn extract_cells(
        &self,
        targets: &[TimeSeriesTarget],
        events: &[Event],
        targets_to_skip: &BTreeSet<String>,
    ) -> Vec<(String, String, DataResult<Artifact>)> {
        let cells: Vec<(&Event, &TimeSeriesTarget)> = events
            .iter()
            .flat_map(|event| targets.iter().map(move |target| (event, target)))
            .collect();

        let fetch = |event: &Event, target: &TimeSeriesTarget| -> DataResult<Artifact> {
            if targets_to_skip.contains(&target.name) {
                warn!(target = %target.name, event = %event.name, "skipping ingress target");
                return Err(DataError::Unavailable {
                    name: target.name.clone(),
                    reason: "target is in the ingress skip list".into(),
                });
            }
            match &self.mode {
                IngressMode::Upstream { source, .. } => self.fetch_upstream(source, event, target),
                IngressMode::Existing { source, origin } => {
                    Self::fetch_existing(source.as_ref(), origin, event, target)
                }
            }
        };

        let results: Vec<DataResult<Artifact>> = match &self.mode {
            IngressMode::Upstream { workers, .. } => {
                match rayon::ThreadPoolBuilder::new().num_threads(*workers).build() {
                    Ok(pool) => pool.install(|| {
                        cells
                            .par_iter()
                            .map(|&(event, target)| fetch(event, target))
                            .collect()
                    }),
                    Err(cause) => {
                        error!(%cause, "failed to build ingress worker pool, querying serially");
                        cells.iter().map(|&(event, target)| fetch(event, target)).collect()
                    }
                }
            }
            IngressMode::Existing { .. } => {
                cells.iter().map(|&(event, target)| fetch(event, target)).collect()
            }
        };

        cells
            .into_iter()
            .zip(results)
            .map(|((event, target), result)| (event.name.clone(), target.name.clone(), result))
            .collect()
    }

    /// Query upstream telemetry for one cell and resample onto the target
    /// grid.
    fn fetch_upstream(
        &self,
        source: &InfluxDataSource,
        event: &Event,
        target: &TimeSeriesTarget,
    ) -> DataResult<Artifact> {
        let query_path = CanonicalPath::new(
            &target.bucket,
            &target.measurement,
            &target.car,
            &target.field,
        );
        let offset = event.time_offset_hours();
        let hints = QueryHints::window(event.start, event.stop, offset);
        let frame_artifact = source.get(&query_path, &hints)?;

        let frame = match frame_artifact.data {
            Some(Payload::DataFrame(frame)) => frame,
            _ => {
                return Err(DataError::Unavailable {
                    name: target.name.clone(),
                    reason: "upstream query returned no data frame".into(),
                })
            }
        };
        let times = frame.get(QUERY_TIME_COLUMN).cloned().unwrap_or_default();
        let values = frame.get(QUERY_VALUE_COLUMN).cloned().unwrap_or_default();
        let samples: Vec<Sample> = times
            .into_iter()
            .zip(values)
            .map(|(unix_s, value)| Sample { unix_s, value })
            .collect();

        // The grid covers the offset window: that is the domain the
        // samples were queried over.
        let shift = time::Duration::seconds_f64(offset.unwrap_or(0.0) * 3600.0);
        let mut series = TimeSeries::from_samples(
            &target.name,
            &target.units,
            target.period_s(),
            event.start + shift,
            event.stop + shift,
            &samples,
        )
        .ok_or_else(|| DataError::Unavailable {
            name: target.name.clone(),
            reason: format!("no samples in window for event {}", event.name),
        })?;

        if let Some(description) = &target.description {
            series.meta.insert("description".into(), description.clone());
        }
        info!(target = %target.name, event = %event.name, points = series.len(),
              "extracted time series from upstream");

        let mut artifact = Artifact::new(
            CanonicalPath::new(
                self.context.title(),
                &event.name,
                INGRESS_SOURCE,
                &target.name,
            ),
            FileType::TimeSeries,
            Some(Payload::TimeSeries(series)),
        );
        artifact.description = target.description.clone();
        Ok(artifact)
    }

    /// Resolve one cell from a previously materialized tree.
    fn fetch_existing(
        source: &dyn DataSource,
        origin: &str,
        event: &Event,
        target: &TimeSeriesTarget,
    ) -> DataResult<Artifact> {
        let path = CanonicalPath::new(origin, &event.name, INGRESS_SOURCE, &target.field);
        source.get(&path, &QueryHints::default())
    }

    /// Store every cell under `(title, event, "ingress", target.name)` and
    /// assemble the view. Failed cells become null-data artifacts.
    fn load_cells(
        &self,
        extracted: Vec<(String, String, DataResult<Artifact>)>,
    ) -> Result<IngressView, PipelineError> {
        let mut view = IngressView::empty(self.context.title());

        for (event, target, result) in extracted {
            let path = CanonicalPath::new(self.context.title(), &event, INGRESS_SOURCE, &target);
            let artifact = match result {
                Ok(artifact) => {
                    info!(path = %path, "loaded ingress cell");
                    artifact.readdressed(path.clone())
                }
                Err(cause) => {
                    error!(path = %path, %target, %event, %cause,
                           "failed to ingress cell, storing null artifact");
                    Artifact::null(path.clone(), FileType::TimeSeries)
                }
            };
            let loader = self
                .context
                .data_source()
                .store(artifact)
                .map_err(PipelineError::Store)?;

            view.cells.entry(event).or_default().insert(target, loader);
        }

        Ok(view)
    }
}

fn reject_own_tree(origin: &str, context: &Context) -> Result<(), ConfigError> {
    if origin == context.title() {
        return Err(ConfigError::IngressOriginCollision {
            origin: origin.to_string(),
        });
    }
    Ok(())
}
