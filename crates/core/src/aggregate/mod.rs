//! Aggregate (gold) layer: incremental rollups and daily analytics.

pub mod ports;
pub mod service;
