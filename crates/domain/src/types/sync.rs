//! Sync engine result types

use serde::{Deserialize, Serialize};

/// Data category moved by the sync engine.
///
/// Categories are always processed in the declaration order below so error
/// reporting stays deterministic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SyncCategory {
    Requests,
    Analytics,
    Configuration,
}

impl SyncCategory {
    /// All categories in processing order.
    pub const ALL: [SyncCategory; 3] =
        [SyncCategory::Requests, SyncCategory::Analytics, SyncCategory::Configuration];

    /// Wire value used in the `dataType` field of sync calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Analytics => "analytics",
            Self::Configuration => "configuration",
        }
    }
}

/// Failure recorded for a single category during a sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryError {
    pub category: SyncCategory,
    pub message: String,
}

/// Outcome of a completed `sync_all` pass.
///
/// A pass that reaches the end is successful even when individual categories
/// recorded errors; fast-fail conditions (already syncing, not
/// authenticated) are separate error variants and never produce a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: u64,
    pub downloaded: u64,
    pub errors: Vec<CategoryError>,
}

impl SyncReport {
    /// Whether every category completed without an error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
