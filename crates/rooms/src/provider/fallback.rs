//! Ordered fallback over several status providers.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::ProviderError;
use super::{CloudProvider, EsudsProvider, StatusProvider};
use crate::model::{Machine, RoomId};

/// Tries providers in priority order and returns the first success.
///
/// Connectivity failures are remembered (last one wins) so the caller sees
/// the most recent network problem when every source fails; any other
/// failure only moves the chain along. The chain has no side effects of its
/// own.
pub struct FallbackChain {
    providers: Vec<Arc<dyn StatusProvider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn StatusProvider>>) -> Self {
        Self { providers }
    }

    pub async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        let mut last_connectivity = None;

        for provider in &self.providers {
            match provider.fetch(room_id).await {
                Ok(machines) => return Ok(machines),
                Err(error) if error.is_connectivity() => {
                    debug!(
                        source = provider.name(),
                        room_id,
                        %error,
                        "status source unreachable; trying next"
                    );
                    last_connectivity = Some(error);
                }
                Err(error) => {
                    debug!(
                        source = provider.name(),
                        room_id,
                        %error,
                        "status source failed; trying next"
                    );
                }
            }
        }

        Err(last_connectivity.unwrap_or(ProviderError::Exhausted))
    }
}

#[async_trait]
impl StatusProvider for FallbackChain {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        FallbackChain::fetch(self, room_id).await
    }
}

/// The default source chain: the JSON mirror first (cheaper to parse and to
/// serve), then the scraper against the upstream site itself.
pub fn default_chain(
    cloud_base_url: &str,
    esuds_base_url: &str,
    client: Client,
) -> FallbackChain {
    FallbackChain::new(vec![
        Arc::new(CloudProvider::new(cloud_base_url, client.clone())),
        Arc::new(EsudsProvider::new(esuds_base_url, client)),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::MachineType;

    struct StubProvider {
        name: &'static str,
        outcome: fn(RoomId) -> Result<Vec<Machine>, ProviderError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(
            name: &'static str,
            outcome: fn(RoomId) -> Result<Vec<Machine>, ProviderError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)(room_id)
        }
    }

    fn one_machine(room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        Ok(vec![Machine::new(room_id, MachineType::Washer, 1)])
    }

    fn offline(_: RoomId) -> Result<Vec<Machine>, ProviderError> {
        Err(ProviderError::Offline)
    }

    fn bad_gateway(_: RoomId) -> Result<Vec<Machine>, ProviderError> {
        Err(ProviderError::BadStatus(reqwest::StatusCode::BAD_GATEWAY))
    }

    fn garbled(_: RoomId) -> Result<Vec<Machine>, ProviderError> {
        Err(ProviderError::Markup("not a table".into()))
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let a = StubProvider::new("a", offline);
        let b = StubProvider::new("b", one_machine);
        let c = StubProvider::new("c", one_machine);
        let chain = FallbackChain::new(vec![a.clone(), b.clone(), c.clone()]);

        let machines = chain.fetch(7).await.unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].room_id, 7);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn last_connectivity_error_wins() {
        let a = StubProvider::new("a", bad_gateway);
        let b = StubProvider::new("b", offline);
        let chain = FallbackChain::new(vec![a, b]);

        let error = chain.fetch(1).await.unwrap_err();
        assert!(matches!(error, ProviderError::Offline));
    }

    #[tokio::test]
    async fn format_failures_are_swallowed() {
        let a = StubProvider::new("a", garbled);
        let b = StubProvider::new("b", one_machine);
        let chain = FallbackChain::new(vec![a, b.clone()]);

        assert!(chain.fetch(1).await.is_ok());
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn connectivity_error_outlives_a_later_format_failure() {
        let a = StubProvider::new("a", offline);
        let b = StubProvider::new("b", garbled);
        let chain = FallbackChain::new(vec![a, b]);

        let error = chain.fetch(1).await.unwrap_err();
        assert!(matches!(error, ProviderError::Offline));
    }

    #[tokio::test]
    async fn all_format_failures_exhaust_the_chain() {
        let chain = FallbackChain::new(vec![
            StubProvider::new("a", garbled),
            StubProvider::new("b", garbled),
        ]);

        let error = chain.fetch(1).await.unwrap_err();
        assert!(matches!(error, ProviderError::Exhausted));
        assert!(error.is_connectivity());
    }

    #[tokio::test]
    async fn empty_chain_reports_exhaustion() {
        let chain = FallbackChain::new(Vec::new());
        let error = chain.fetch(1).await.unwrap_err();
        assert!(matches!(error, ProviderError::Exhausted));
    }
}
