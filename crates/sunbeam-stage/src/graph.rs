//! Stage dependency graph construction.
//!
//! The driver requests a set of stage names; execution covers their
//! transitive closure under declared dependencies, leaves first, so every
//! stage runs after the stages it consumes.

use std::collections::BTreeSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use sunbeam_core::ConfigError;

use crate::registry::StageRegistry;

/// Compute the execution order for `requested`: the dependency closure in
/// topological order, dependencies before dependents. Unregistered names
/// and cycles are configuration errors.
pub fn build_stage_graph(
    requested: &[String],
    registry: &StageRegistry,
) -> Result<Vec<String>, ConfigError> {
    let mut graph: DiGraphMap<&'static str, ()> = DiGraphMap::new();
    // add_edge inserts endpoints implicitly, so graph membership cannot
    // double as the visited set.
    let mut visited: BTreeSet<&'static str> = BTreeSet::new();
    let mut pending: Vec<&str> = requested.iter().map(String::as_str).collect();

    while let Some(name) = pending.pop() {
        let descriptor = registry.get(name)?;
        if !visited.insert(descriptor.name) {
            continue;
        }
        graph.add_node(descriptor.name);
        for dep in descriptor.dependencies {
            // dep -> stage, so a topological sort yields dependencies first.
            let dep = registry.get(dep)?;
            graph.add_edge(dep.name, descriptor.name, ());
            pending.push(dep.name);
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| ConfigError::DependencyCycle {
        stage: cycle.node_id().to_string(),
    })?;

    Ok(order.into_iter().map(str::to_string).collect())
}
