//! # NetLens Core
//!
//! Pipeline services and port interfaces for NetLens.
//!
//! This crate holds the medallion pipeline: ingest (bronze), transform
//! (silver) and aggregate (gold). Services are written against port traits
//! so the storage backend stays swappable and unit-testable.

pub mod aggregate;
pub mod ingest;
pub mod kv_ports;
pub mod transform;

pub use aggregate::ports::StatsStore;
pub use aggregate::service::AggregationService;
pub use ingest::ports::RawEventStore;
pub use ingest::service::IngestService;
pub use kv_ports::KeyValueStore;
pub use transform::ports::{CanonicalRecordStore, UpsertOutcome};
pub use transform::service::{TransformOutcome, TransformService};
