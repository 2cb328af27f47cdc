//! sunbeam-store
//!
//! The four concrete [`DataSource`] backends:
//! - [`FsDataSource`]: one CBOR blob per artifact under a root directory
//! - [`MongoDataSource`]: one document per artifact, keyed by the canonical
//!   four-tuple under a unique compound index
//! - [`InfluxDataSource`]: read-only window queries against the upstream
//!   telemetry database
//! - [`PeerDataSource`]: read-only fetches from another Sunbeam instance
//!
//! [`build_data_source`] constructs the writable backends from
//! configuration; ingress builds its own source since it also accepts the
//! read-only kinds.
//!
//! [`DataSource`]: sunbeam_core::DataSource

pub mod document;
pub mod factory;
pub mod fs;
pub mod peer;
pub mod upstream;

pub use crate::document::MongoDataSource;
pub use crate::factory::build_data_source;
pub use crate::fs::FsDataSource;
pub use crate::peer::PeerDataSource;
pub use crate::upstream::InfluxDataSource;
