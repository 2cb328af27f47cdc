//! sunbeam-cli
//!
//! The pipeline driver: argument surface, configuration collection, and
//! the run loop. The `sunbeam` binary is a thin wrapper over
//! [`run::run_pipeline`], kept as a library so black-box tests can drive a
//! run in-process.

pub mod args;
pub mod collect;
pub mod run;
