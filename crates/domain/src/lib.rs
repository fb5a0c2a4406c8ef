//! # NetLens Domain
//!
//! Business domain types and models for NetLens.
//!
//! This crate contains:
//! - Telemetry data types (RawEvent, CanonicalRecord, rollup stats)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other NetLens crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
