//! Persistent-store abstraction.
//!
//! The concrete store engine lives outside the core; this module defines the
//! records it holds and the operations the refresher and the notification
//! sweep need from it. [`MemoryStore`] is the in-process implementation used
//! by the daemon and by tests.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rooms_status::model::{Machine, MachineKey, MachineStatus, RoomId};

/// A machine record as persisted: the reported machine plus the moment the
/// containing room set was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMachine {
    pub machine: Machine,
    pub last_updated: DateTime<Utc>,
}

/// A user's request to be told when one machine reaches a desired status.
///
/// Only its creator and the notification sweep touch this record, and the
/// sweep only ever updates the completion estimate or deletes the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: i64,
    pub machine: MachineKey,
    pub desired_status: MachineStatus,
    pub created_at: DateTime<Utc>,
    /// When the machine is expected to reach the desired status; `None`
    /// until the sweep has observed it at least once.
    pub estimated_completion_at: Option<DateTime<Utc>>,
}

/// What a creating action supplies; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPendingNotification {
    pub machine: MachineKey,
    pub desired_status: MachineStatus,
}

/// Failures of the underlying store. Callers propagate these; nothing in the
/// core retries them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o: {0}")]
    Io(String),
}

/// Operations the core needs from whatever holds the records.
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// Replace a room's whole machine set in one logical operation. The
    /// previous set is superseded entirely.
    async fn replace_room(
        &self,
        room_id: RoomId,
        machines: Vec<StoredMachine>,
    ) -> Result<(), StoreError>;

    async fn machines_in_room(&self, room_id: RoomId) -> Result<Vec<StoredMachine>, StoreError>;

    async fn insert_pending(
        &self,
        request: NewPendingNotification,
    ) -> Result<PendingNotification, StoreError>;

    /// All pending notifications, grouped by the room they watch.
    async fn pending_by_room(
        &self,
    ) -> Result<HashMap<RoomId, Vec<PendingNotification>>, StoreError>;

    /// Delete one pending notification. Deleting an id that is already gone
    /// is not an error.
    async fn delete_pending(&self, id: i64) -> Result<(), StoreError>;

    async fn update_pending_estimate(
        &self,
        id: i64,
        estimated_completion_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
