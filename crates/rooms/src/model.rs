//! Machine data model shared by every status backend.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a laundry room, assigned by the upstream service.
pub type RoomId = u64;

/// Kind of machine found in a room.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "title_case", ascii_case_insensitive)]
pub enum MachineType {
    Washer,
    Dryer,
    Unknown,
}

impl MachineType {
    /// Classify the free-form type label reported by a backend.
    ///
    /// Backends agree only on the words "washer" and "dryer" appearing
    /// somewhere in the label ("Front Load Washer", "dryer - stacked", ...),
    /// so this is a case-insensitive substring match.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("washer") {
            MachineType::Washer
        } else if lower.contains("dryer") {
            MachineType::Dryer
        } else {
            MachineType::Unknown
        }
    }
}

/// Reported machine status.
///
/// The declaration order is load-bearing: it runs from "ready for the user"
/// to "nothing known", and [`MachineStatus::satisfies`] compares along it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "title_case", ascii_case_insensitive)]
pub enum MachineStatus {
    Available,
    CycleComplete,
    InUse,
    Unavailable,
    Unknown,
}

impl MachineStatus {
    /// Parse one of the known status phrases, case-insensitively.
    ///
    /// Returns `None` for anything outside the known set so each backend can
    /// pick its own fallback value.
    pub fn parse_report(text: &str) -> Option<Self> {
        Self::from_str(text.trim()).ok()
    }

    /// Map a raw ordinal to a status, defaulting to `Unknown` out of range.
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => MachineStatus::Available,
            1 => MachineStatus::CycleComplete,
            2 => MachineStatus::InUse,
            3 => MachineStatus::Unavailable,
            _ => MachineStatus::Unknown,
        }
    }

    /// Whether a machine observed in this status has progressed at least as
    /// far toward "ready" as the status the user asked to be told about.
    ///
    /// A machine that is `Available` satisfies a desired `CycleComplete`;
    /// an `InUse` machine satisfies neither.
    pub fn satisfies(self, desired: MachineStatus) -> bool {
        self <= desired
    }
}

/// Identity of a machine within the whole system.
///
/// Upstream ids are not always present, so `(room, kind, number)` is the
/// primary key a machine is tracked under across refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineKey {
    pub room_id: RoomId,
    pub kind: MachineType,
    pub number: i32,
}

/// One washer/dryer unit as reported by a status backend.
///
/// Records are value objects: a fetch produces a complete replacement set
/// for a room and individual records are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub room_id: RoomId,
    /// Upstream identifier, when the backend exposes one.
    pub external_id: Option<i64>,
    /// Position within the room; -1 when the backend does not number it.
    pub number: i32,
    pub kind: MachineType,
    pub status: MachineStatus,
    /// Remaining cycle time as reported; `None` when nothing was reported.
    pub time_remaining: Option<Duration>,
}

impl Machine {
    pub fn new(room_id: RoomId, kind: MachineType, number: i32) -> Self {
        Self {
            room_id,
            external_id: None,
            number,
            kind,
            status: MachineStatus::Unknown,
            time_remaining: None,
        }
    }

    pub fn key(&self) -> MachineKey {
        MachineKey {
            room_id: self.room_id,
            kind: self.kind,
            number: self.number,
        }
    }

    pub fn has_time_remaining(&self) -> bool {
        self.time_remaining.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_runs_from_ready_to_unknown() {
        assert!(MachineStatus::Available < MachineStatus::CycleComplete);
        assert!(MachineStatus::CycleComplete < MachineStatus::InUse);
        assert!(MachineStatus::InUse < MachineStatus::Unavailable);
        assert!(MachineStatus::Unavailable < MachineStatus::Unknown);
    }

    #[test]
    fn satisfies_follows_readiness() {
        assert!(MachineStatus::Available.satisfies(MachineStatus::Available));
        assert!(MachineStatus::Available.satisfies(MachineStatus::CycleComplete));
        assert!(MachineStatus::CycleComplete.satisfies(MachineStatus::InUse));
        assert!(!MachineStatus::InUse.satisfies(MachineStatus::Available));
        assert!(!MachineStatus::Unknown.satisfies(MachineStatus::Unavailable));
    }

    #[test]
    fn status_phrases_parse_case_insensitively() {
        assert_eq!(
            MachineStatus::parse_report("Available"),
            Some(MachineStatus::Available)
        );
        assert_eq!(
            MachineStatus::parse_report("cycle complete"),
            Some(MachineStatus::CycleComplete)
        );
        assert_eq!(
            MachineStatus::parse_report("IN USE"),
            Some(MachineStatus::InUse)
        );
        assert_eq!(
            MachineStatus::parse_report(" unavailable "),
            Some(MachineStatus::Unavailable)
        );
        assert_eq!(
            MachineStatus::parse_report("unknown"),
            Some(MachineStatus::Unknown)
        );
        assert_eq!(MachineStatus::parse_report("out to lunch"), None);
    }

    #[test]
    fn ordinals_out_of_range_become_unknown() {
        assert_eq!(MachineStatus::from_ordinal(0), MachineStatus::Available);
        assert_eq!(MachineStatus::from_ordinal(3), MachineStatus::Unavailable);
        assert_eq!(MachineStatus::from_ordinal(7), MachineStatus::Unknown);
    }

    #[test]
    fn type_labels_match_by_substring() {
        assert_eq!(
            MachineType::from_label("Front Load Washer"),
            MachineType::Washer
        );
        assert_eq!(MachineType::from_label("DRYER (stacked)"), MachineType::Dryer);
        assert_eq!(MachineType::from_label("Mangle"), MachineType::Unknown);
    }

    #[test]
    fn machine_key_ignores_status_and_time() {
        let mut a = Machine::new(7, MachineType::Washer, 3);
        a.status = MachineStatus::InUse;
        a.time_remaining = Some(Duration::from_secs(600));
        let b = Machine::new(7, MachineType::Washer, 3);
        assert_eq!(a.key(), b.key());
    }
}
