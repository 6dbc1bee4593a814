//! In-memory store implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use rooms_status::model::RoomId;

use super::{
    MachineStore, NewPendingNotification, PendingNotification, StoreError, StoredMachine,
};

/// Process-local store. Replacements and row updates happen under a single
/// writer lock per table, which gives the same "whole set or nothing"
/// behavior the trait promises.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomId, Vec<StoredMachine>>>,
    pending: RwLock<Vec<PendingNotification>>,
    next_pending_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MachineStore for MemoryStore {
    async fn replace_room(
        &self,
        room_id: RoomId,
        machines: Vec<StoredMachine>,
    ) -> Result<(), StoreError> {
        self.rooms.write().insert(room_id, machines);
        Ok(())
    }

    async fn machines_in_room(&self, room_id: RoomId) -> Result<Vec<StoredMachine>, StoreError> {
        Ok(self.rooms.read().get(&room_id).cloned().unwrap_or_default())
    }

    async fn insert_pending(
        &self,
        request: NewPendingNotification,
    ) -> Result<PendingNotification, StoreError> {
        let notification = PendingNotification {
            id: self.next_pending_id.fetch_add(1, Ordering::SeqCst),
            machine: request.machine,
            desired_status: request.desired_status,
            created_at: Utc::now(),
            estimated_completion_at: None,
        };
        self.pending.write().push(notification.clone());
        Ok(notification)
    }

    async fn pending_by_room(
        &self,
    ) -> Result<HashMap<RoomId, Vec<PendingNotification>>, StoreError> {
        let mut by_room: HashMap<RoomId, Vec<PendingNotification>> = HashMap::new();
        for notification in self.pending.read().iter() {
            by_room
                .entry(notification.machine.room_id)
                .or_default()
                .push(notification.clone());
        }
        Ok(by_room)
    }

    async fn delete_pending(&self, id: i64) -> Result<(), StoreError> {
        self.pending.write().retain(|n| n.id != id);
        Ok(())
    }

    async fn update_pending_estimate(
        &self,
        id: i64,
        estimated_completion_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(notification) = self.pending.write().iter_mut().find(|n| n.id == id) {
            notification.estimated_completion_at = Some(estimated_completion_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rooms_status::model::{Machine, MachineStatus, MachineType};

    fn stored(room_id: RoomId, number: i32) -> StoredMachine {
        StoredMachine {
            machine: Machine::new(room_id, MachineType::Washer, number),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replace_then_list_round_trips_exactly() {
        let store = MemoryStore::new();

        let first = vec![stored(1, 1), stored(1, 2)];
        store.replace_room(1, first.clone()).await.unwrap();
        assert_eq!(store.machines_in_room(1).await.unwrap(), first);

        // A second replacement supersedes the old set entirely, independent
        // of what was stored before.
        let second = vec![stored(1, 9)];
        store.replace_room(1, second.clone()).await.unwrap();
        assert_eq!(store.machines_in_room(1).await.unwrap(), second);
    }

    #[tokio::test]
    async fn rooms_are_independent() {
        let store = MemoryStore::new();
        store.replace_room(1, vec![stored(1, 1)]).await.unwrap();
        store.replace_room(2, vec![stored(2, 1)]).await.unwrap();

        assert_eq!(store.machines_in_room(1).await.unwrap().len(), 1);
        assert_eq!(store.machines_in_room(2).await.unwrap().len(), 1);
        assert!(store.machines_in_room(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_lifecycle() {
        let store = MemoryStore::new();
        let created = store
            .insert_pending(NewPendingNotification {
                machine: Machine::new(4, MachineType::Dryer, 2).key(),
                desired_status: MachineStatus::Available,
            })
            .await
            .unwrap();
        assert_eq!(created.estimated_completion_at, None);

        let by_room = store.pending_by_room().await.unwrap();
        assert_eq!(by_room.len(), 1);
        assert_eq!(by_room[&4].len(), 1);

        let estimate = Utc::now();
        store
            .update_pending_estimate(created.id, estimate)
            .await
            .unwrap();
        let by_room = store.pending_by_room().await.unwrap();
        assert_eq!(by_room[&4][0].estimated_completion_at, Some(estimate));

        store.delete_pending(created.id).await.unwrap();
        assert!(store.pending_by_room().await.unwrap().is_empty());

        // Idempotent delete.
        store.delete_pending(created.id).await.unwrap();
    }
}
