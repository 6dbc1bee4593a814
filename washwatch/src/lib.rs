//! washwatch library crate.
//!
//! Orchestration on top of `rooms-status`: the store abstraction, the room
//! refresher, the notification sweep with its wake scheduling, and the
//! daemon's config and logging plumbing.

pub mod config;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod refresher;
pub mod scheduler;
pub mod store;

pub use config::WatcherConfig;
pub use error::{Error, Result};
pub use refresher::{RefreshEvent, RefreshOutcome, RoomRefresher};
pub use scheduler::{EstimatePolicy, NotificationScheduler, SweepSummary};
