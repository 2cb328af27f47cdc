//! The pipeline driver.
//!
//! A linear script with no state of its own: collect configuration, build
//! the dependency closure, construct the primary store and the context, run
//! ingress once over all (target, event) cells, then walk the events and
//! run each downstream stage in topological order.
//!
//! The driver is the only place that knows which loaders feed which stage;
//! that wiring is static, per stage name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::info;

use sunbeam_core::{ArtifactLoader, ConfigError, Event, PipelineError};
use sunbeam_stage::{
    build_stage_graph, builtin_registry, power_inputs, Context, EnergyStage, IngressStage,
    IngressView, PowerStage, Stage,
};
use sunbeam_store::build_data_source;

use crate::collect;

/// Everything `sunbeam run` does, separated from argument parsing so tests
/// can drive it directly.
pub fn run_pipeline(
    config_dir: &Path,
    title: &str,
    skip_stages: Vec<String>,
    skip_targets: Vec<String>,
) -> Result<(), PipelineError> {
    let (sunbeam_config, stage_source_config, ingress_config) =
        collect::primary_config(config_dir)?;
    let targets = collect::targets(config_dir, &sunbeam_config.ingress_description_file)?;
    let events = collect::events(config_dir, &sunbeam_config.events_description_file)?;

    let registry = builtin_registry();
    let order = build_stage_graph(&sunbeam_config.stages_to_run, &registry)?;
    info!(order = %order.join(" -> "), "executing stages in order");

    let data_source = build_data_source(&stage_source_config)?;
    let stage_data_root = config_dir.join(&sunbeam_config.stage_data_root);
    let stages_to_skip: BTreeSet<String> = skip_stages.into_iter().collect();
    Context::initialize(title, data_source, stages_to_skip, registry, stage_data_root)?;

    let targets_to_skip: BTreeSet<String> = skip_targets.into_iter().collect();
    let ingress = IngressStage::new(&ingress_config)?;
    let view = ingress.run(&targets, &events, &targets_to_skip)?;

    // Process each event separately.
    for event in &events {
        run_event(event, &order, &view)?;
    }

    info!(title, "pipeline run complete");
    Ok(())
}

fn run_event(event: &Event, order: &[String], view: &IngressView) -> Result<(), PipelineError> {
    info!(event = %event.name, "processing event");
    let event_view = view.event(&event.name);
    let mut harvested: BTreeMap<&str, Vec<ArtifactLoader>> = BTreeMap::new();

    for stage_name in order {
        match stage_name.as_str() {
            // Ingress already ran, once, across all events.
            "ingress" => {}

            "power" => {
                let mut stage = PowerStage::new(event)?;
                let outputs = stage.run(&power_inputs(&event_view))?;
                harvested.insert("power", outputs);
            }

            "energy" => {
                // pack_power is the first declared power output.
                let inputs: Vec<ArtifactLoader> = harvested
                    .get("power")
                    .and_then(|outputs| outputs.first())
                    .cloned()
                    .into_iter()
                    .collect();
                let mut stage = EnergyStage::new(event)?;
                let outputs = stage.run(&inputs)?;
                harvested.insert("energy", outputs);
            }

            other => {
                return Err(ConfigError::UnregisteredStage {
                    name: other.to_string(),
                }
                .into())
            }
        }
    }
    Ok(())
}

/// Resolve and print the execution order without running anything.
pub fn print_graph(config_dir: &Path) -> Result<(), PipelineError> {
    let (sunbeam_config, _, _) = collect::primary_config(config_dir)?;
    let registry = builtin_registry();
    let order = build_stage_graph(&sunbeam_config.stages_to_run, &registry)?;
    println!("{}", order.join(" -> "));
    Ok(())
}
