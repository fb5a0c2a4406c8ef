//! Transform (silver) layer: validate, normalize and enrich raw events.

pub mod normalize;
pub mod ports;
pub mod service;
