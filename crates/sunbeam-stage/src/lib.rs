//! sunbeam-stage
//!
//! The stage framework:
//! - [`Stage`]: the extract/transform/load contract and its `run` driver
//! - [`StageRegistry`]: explicit name → descriptor table, assembled at
//!   startup
//! - [`Context`]: the run-scoped singleton stages acquire at construction
//! - [`build_stage_graph`]: dependency closure and execution order
//! - [`IngressStage`]: the bridge from external telemetry into the
//!   internal artifact namespace
//! - static stage data loading
//! - the built-in `power` and `energy` stages

pub mod context;
pub mod energy;
pub mod graph;
pub mod ingress;
pub mod power;
pub mod registry;
pub mod stage;
pub mod stage_data;

pub use crate::context::Context;
pub use crate::energy::{EnergyStage, ENERGY_DESCRIPTOR};
pub use crate::graph::build_stage_graph;
pub use crate::ingress::{EventView, IngressStage, IngressView, INGRESS_DESCRIPTOR};
pub use crate::power::{power_inputs, PowerStage, POWER_DESCRIPTOR};
pub use crate::registry::{builtin_registry, StageDescriptor, StageOutput, StageRegistry};
pub use crate::stage::Stage;
pub use crate::stage_data::{load_stage_data, StageData};
