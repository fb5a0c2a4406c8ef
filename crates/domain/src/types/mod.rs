//! Domain types and models

pub mod auth;
pub mod events;
pub mod records;
pub mod stats;
pub mod sync;

pub use auth::SessionTokens;
pub use events::{EventCategory, RawEvent, SequencedRawEvent};
pub use records::{CanonicalRecord, RecordFilter};
pub use stats::{DailyAnalytics, DomainStat, HourlyStat, ResourceStat, StatDelta};
pub use sync::{CategoryError, SyncCategory, SyncReport};
