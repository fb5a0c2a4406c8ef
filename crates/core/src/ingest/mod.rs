//! Ingest (bronze) layer: append-only raw event intake.

pub mod ports;
pub mod service;
