//! rooms-status: machine-status acquisition for shared laundry rooms.
//!
//! The crate models washers and dryers grouped into rooms and fetches their
//! live status from heterogeneous backends — an HTML scraper, a JSON API
//! mirror, and synthetic generators — composed behind an ordered fallback
//! chain.

pub mod model;
pub mod provider;

pub use model::{Machine, MachineKey, MachineStatus, MachineType, RoomId};
pub use provider::{FallbackChain, ProviderError, StatusProvider};
