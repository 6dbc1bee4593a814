//! Status providers: the pluggable sources a room's machine set is
//! fetched from, plus the fallback chain composing them.

pub mod backend;
pub mod cloud;
pub mod error;
pub mod esuds;
pub mod fallback;
pub mod synthetic;

pub use backend::{Backend, client_with_timeout, default_client};
pub use cloud::CloudProvider;
pub use error::ProviderError;
pub use esuds::EsudsProvider;
pub use fallback::{FallbackChain, default_chain};
pub use synthetic::{CyclingProvider, RandomProvider};

use async_trait::async_trait;

use crate::model::{Machine, RoomId};

/// A source of machine status for a room.
///
/// Implementations are interchangeable behind `Arc<dyn StatusProvider>`;
/// callers never need to know which backend actually answered.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Short source name, used in logs.
    fn name(&self) -> &'static str;

    /// Fetch the complete machine set of one room.
    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError>;
}

/// Current network-connectivity state, queried before a request is attempted
/// by providers that insist on an active connection.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// The default connectivity answer for environments without a usable probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
