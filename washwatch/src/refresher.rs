//! Room refresher: fetches one room through the provider chain and replaces
//! its stored machine set.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use rooms_status::model::RoomId;
use rooms_status::provider::StatusProvider;

use crate::Result;
use crate::store::{MachineStore, StoredMachine};

/// Outcome of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The room's stored set was replaced with fresh data.
    Refreshed { machines: usize },
    /// No source could be reached; the previous data stays in place.
    Failed,
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

/// Emitted after every refresh attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub room_id: RoomId,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Broadcaster for refresh events.
pub struct RefreshEventBroadcaster {
    sender: broadcast::Sender<RefreshEvent>,
}

impl RefreshEventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, room_id: RoomId, success: bool) {
        // Ignore errors - just means no subscribers currently.
        let _ = self.sender.send(RefreshEvent {
            room_id,
            success,
            timestamp: Utc::now(),
        });
    }
}

impl Default for RefreshEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Refreshes rooms through a status source and writes the results.
///
/// Refreshes of the same room are serialized through a per-room lock — the
/// store replacement must not interleave with itself — while different rooms
/// refresh in parallel freely.
pub struct RoomRefresher<S: MachineStore> {
    source: Arc<dyn StatusProvider>,
    store: Arc<S>,
    events: RefreshEventBroadcaster,
    room_locks: Mutex<HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: MachineStore> RoomRefresher<S> {
    pub fn new(source: Arc<dyn StatusProvider>, store: Arc<S>) -> Self {
        Self {
            source,
            store,
            events: RefreshEventBroadcaster::new(),
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to refresh completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    fn room_lock(&self, room_id: RoomId) -> Arc<tokio::sync::Mutex<()>> {
        self.room_locks
            .lock()
            .entry(room_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Refresh one room.
    ///
    /// A source failure is not an error: the previous data is preferred over
    /// no data, the failure surfaces only through the outcome and the
    /// emitted event. A store failure, on the other hand, propagates.
    pub async fn refresh(&self, room_id: RoomId) -> Result<RefreshOutcome> {
        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        match self.source.fetch(room_id).await {
            Ok(machines) => {
                let now = Utc::now();
                let stamped: Vec<StoredMachine> = machines
                    .into_iter()
                    .map(|machine| StoredMachine {
                        machine,
                        last_updated: now,
                    })
                    .collect();
                let count = stamped.len();

                self.store.replace_room(room_id, stamped).await?;
                self.events.publish(room_id, true);
                debug!(room_id, machines = count, "room refreshed");
                Ok(RefreshOutcome::Refreshed { machines: count })
            }
            Err(error) => {
                warn!(room_id, %error, "room refresh failed; keeping previous data");
                self.events.publish(room_id, false);
                Ok(RefreshOutcome::Failed)
            }
        }
    }

    /// Refresh several rooms concurrently, one in-flight attempt per room.
    pub async fn refresh_many(&self, room_ids: &[RoomId]) -> Result<Vec<(RoomId, RefreshOutcome)>> {
        let attempts = room_ids
            .iter()
            .map(|&room_id| async move { (room_id, self.refresh(room_id).await) });

        let mut outcomes = Vec::with_capacity(room_ids.len());
        for (room_id, outcome) in futures::future::join_all(attempts).await {
            outcomes.push((room_id, outcome?));
        }
        Ok(outcomes)
    }
}
