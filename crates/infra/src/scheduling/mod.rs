//! Background task scheduling.
//!
//! Every scheduler owns one tokio task guarded by a [`CancellationToken`]:
//! `start()` replaces any running task, `stop()` cancels and joins with a
//! timeout, and dropping a scheduler cancels its loop.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod error;
pub mod maintenance_scheduler;
pub mod rollup_scheduler;
pub mod sync_scheduler;
pub mod transform_worker;

pub use error::{SchedulerError, SchedulerResult};
pub use maintenance_scheduler::{MaintenanceScheduler, MaintenanceSchedulerConfig};
pub use rollup_scheduler::RollupScheduler;
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
pub use transform_worker::{TransformWorker, TransformWorkerConfig};
