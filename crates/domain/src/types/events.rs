//! Captured telemetry events (bronze layer)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a captured telemetry event.
///
/// Wire values match the capture side: `request`, `web-vital`, `security`,
/// `third-party`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    Request,
    WebVital,
    Security,
    ThirdParty,
}

impl EventCategory {
    /// Stable string form used for storage and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::WebVital => "web-vital",
            Self::Security => "security",
            Self::ThirdParty => "third-party",
        }
    }

    /// Parse the stable string form back into a category.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "request" => Some(Self::Request),
            "web-vital" => Some(Self::WebVital),
            "security" => Some(Self::Security),
            "third-party" => Some(Self::ThirdParty),
            _ => None,
        }
    }
}

/// A single captured event, immutable once appended.
///
/// The payload is kept opaque at this layer; the transform layer is the only
/// component that interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    pub id: String,
    pub category: EventCategory,
    pub payload: serde_json::Value,
    /// Capture time in epoch milliseconds
    pub captured_at: i64,
}

impl RawEvent {
    /// Build a new raw event captured now.
    pub fn new(category: EventCategory, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            payload,
            captured_at: Utc::now().timestamp_millis(),
        }
    }
}

/// A raw event paired with its storage-assigned sequence number.
///
/// The sequence is monotonically increasing and drives the transform cursor.
#[derive(Debug, Clone)]
pub struct SequencedRawEvent {
    pub seq: i64,
    pub event: RawEvent,
}
