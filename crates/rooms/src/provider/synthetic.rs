//! Synthetic providers: deterministic or pseudo-random machine sets with no
//! I/O, for exercising the pipeline and the notification sweep without live
//! data.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::RngExt;

use super::StatusProvider;
use super::error::ProviderError;
use crate::model::{Machine, MachineStatus, MachineType, RoomId};

const SECONDS_PER_MINUTE: u64 = 60;

/// Generates a room of machines with uniformly random statuses.
pub struct RandomProvider {
    capacity: usize,
}

impl RandomProvider {
    pub fn new() -> Self {
        Self { capacity: 32 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    fn random_machine(
        rng: &mut impl Rng,
        room_id: RoomId,
        kind: MachineType,
        number: usize,
        max_minutes: u64,
    ) -> Machine {
        let mut machine = Machine::new(room_id, kind, number as i32);
        machine.status = MachineStatus::from_ordinal(rng.random_range(0..4u8));
        if machine.status > MachineStatus::CycleComplete {
            machine.time_remaining = Some(Duration::from_secs(
                rng.random_range(0..max_minutes) * SECONDS_PER_MINUTE,
            ));
        }
        machine
    }
}

impl Default for RandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusProvider for RandomProvider {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        let mut rng = rand::rng();
        let mut machines = Vec::with_capacity(self.capacity);
        let third = self.capacity / 3;

        for number in 0..third {
            machines.push(Self::random_machine(
                &mut rng,
                room_id,
                MachineType::Washer,
                number,
                30,
            ));
        }
        for number in third..third * 2 {
            machines.push(Self::random_machine(
                &mut rng,
                room_id,
                MachineType::Dryer,
                number,
                60,
            ));
        }
        for number in third * 2..self.capacity {
            machines.push(Self::random_machine(
                &mut rng,
                room_id,
                MachineType::Washer,
                number,
                1000,
            ));
        }

        Ok(machines)
    }
}

/// Generates machines whose status steps through the whole enum, one step
/// per call, ending at `Available`. Repeated fetches drive every status
/// transition the notification sweep cares about.
pub struct CyclingProvider {
    machines_returned: usize,
    iteration: AtomicU32,
}

impl CyclingProvider {
    pub fn new() -> Self {
        Self {
            machines_returned: 8 * 3,
            iteration: AtomicU32::new(0),
        }
    }
}

impl Default for CyclingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusProvider for CyclingProvider {
    fn name(&self) -> &'static str {
        "cycling"
    }

    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        let iteration = self.iteration.fetch_add(1, Ordering::SeqCst);
        let status = MachineStatus::from_ordinal((4 - iteration % 5) as u8);
        let third = self.machines_returned / 3;

        let blocks = [
            (0..third, MachineType::Washer),
            (third..third * 2, MachineType::Dryer),
            (third * 2..self.machines_returned, MachineType::Unknown),
        ];

        let mut machines = Vec::with_capacity(self.machines_returned);
        for (range, kind) in blocks {
            for number in range {
                let mut machine = Machine::new(room_id, kind, number as i32);
                machine.status = status;
                if status == MachineStatus::InUse {
                    machine.time_remaining = Some(Duration::from_secs(SECONDS_PER_MINUTE));
                }
                machines.push(machine);
            }
        }

        Ok(machines)
    }
}
