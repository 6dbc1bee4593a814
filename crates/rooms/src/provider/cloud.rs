//! JSON-API provider backed by the cloud status mirror.
//!
//! The mirror exposes a room's machines as a JSON array. Unlike the
//! scraper, this provider refuses to even attempt a request without an
//! active network connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::backend::Backend;
use super::error::ProviderError;
use super::{AlwaysOnline, Connectivity, StatusProvider};
use crate::model::{Machine, MachineStatus, MachineType, RoomId};

/// One machine object as serialized by the mirror. Unknown fields are
/// skipped; known fields are all optional and fall back to sentinels.
#[derive(Debug, Deserialize)]
struct CloudMachine {
    #[serde(default)]
    esuds_id: Option<i64>,
    #[serde(default)]
    number: Option<i32>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, rename = "timeRemaining")]
    time_remaining_ms: Option<i64>,
}

impl CloudMachine {
    fn into_machine(self, room_id: RoomId) -> Machine {
        let kind = self
            .kind
            .as_deref()
            .map(MachineType::from_label)
            .unwrap_or(MachineType::Unknown);
        let mut machine = Machine::new(room_id, kind, self.number.unwrap_or(-1));
        machine.external_id = self.esuds_id.filter(|&id| id >= 0);
        // A status field the mirror sends but we cannot place means the
        // machine is effectively unusable, not merely unknown.
        machine.status = match self.status.as_deref() {
            Some(text) => {
                MachineStatus::parse_report(text).unwrap_or(MachineStatus::Unavailable)
            }
            None => MachineStatus::Unknown,
        };
        machine.time_remaining = self
            .time_remaining_ms
            .filter(|&millis| millis >= 0)
            .map(|millis| Duration::from_millis(millis as u64));
        machine
    }
}

/// Provider calling the cloud room-status JSON endpoint.
pub struct CloudProvider {
    backend: Backend,
    connectivity: Arc<dyn Connectivity>,
}

impl CloudProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://net-zdremann-wc.appspot.com";

    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self::with_connectivity(base_url, client, Arc::new(AlwaysOnline))
    }

    pub fn with_connectivity(
        base_url: impl Into<String>,
        client: Client,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            backend: Backend::new("cloud", base_url, client),
            connectivity,
        }
    }

    fn room_url(&self, room_id: RoomId) -> String {
        format!("{}/status/{}", self.backend.base_url, room_id)
    }
}

#[async_trait]
impl StatusProvider for CloudProvider {
    fn name(&self) -> &'static str {
        self.backend.name
    }

    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        if !self.connectivity.is_online() {
            return Err(ProviderError::Offline);
        }

        let response = self.backend.get(&self.room_url(room_id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus(status));
        }

        let body = response.text().await?;
        let raw: Vec<CloudMachine> = serde_json::from_str(&body)?;
        Ok(raw
            .into_iter()
            .map(|machine| machine.into_machine(room_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(json: &str) -> Machine {
        let raw: CloudMachine = serde_json::from_str(json).unwrap();
        raw.into_machine(17)
    }

    #[test]
    fn full_object_maps_every_field() {
        let machine = parse_one(
            r#"{"esuds_id": 2001, "number": 4, "type": "Top Load Washer",
                "status": "In Use", "timeRemaining": 540000,
                "unexpected": {"nested": true}}"#,
        );
        assert_eq!(machine.room_id, 17);
        assert_eq!(machine.external_id, Some(2001));
        assert_eq!(machine.number, 4);
        assert_eq!(machine.kind, MachineType::Washer);
        assert_eq!(machine.status, MachineStatus::InUse);
        assert_eq!(machine.time_remaining, Some(Duration::from_millis(540_000)));
    }

    #[test]
    fn missing_fields_fall_back_to_sentinels() {
        let machine = parse_one("{}");
        assert_eq!(machine.external_id, None);
        assert_eq!(machine.number, -1);
        assert_eq!(machine.kind, MachineType::Unknown);
        assert_eq!(machine.status, MachineStatus::Unknown);
        assert_eq!(machine.time_remaining, None);
    }

    #[test]
    fn unrecognized_status_text_means_unavailable() {
        let machine = parse_one(r#"{"status": "Exploded"}"#);
        assert_eq!(machine.status, MachineStatus::Unavailable);
    }

    #[test]
    fn status_matching_is_case_insensitive() {
        assert_eq!(
            parse_one(r#"{"status": "cycle complete"}"#).status,
            MachineStatus::CycleComplete
        );
        assert_eq!(
            parse_one(r#"{"status": "AVAILABLE"}"#).status,
            MachineStatus::Available
        );
    }

    #[test]
    fn negative_sentinels_become_none() {
        let machine = parse_one(r#"{"esuds_id": -1, "timeRemaining": -1}"#);
        assert_eq!(machine.external_id, None);
        assert_eq!(machine.time_remaining, None);
    }

    #[tokio::test]
    async fn offline_check_short_circuits_before_any_request() {
        struct NeverOnline;
        impl Connectivity for NeverOnline {
            fn is_online(&self) -> bool {
                false
            }
        }

        // The bogus base URL would fail the request; Offline proves the
        // provider never got that far.
        let provider = CloudProvider::with_connectivity(
            "http://invalid.invalid",
            Client::new(),
            Arc::new(NeverOnline),
        );
        let error = provider.fetch(1).await.unwrap_err();
        assert!(matches!(error, ProviderError::Offline));
    }

    #[test]
    fn room_url_addresses_the_status_path() {
        let provider = CloudProvider::new("http://net-zdremann-wc.appspot.com", Client::new());
        assert_eq!(
            provider.room_url(42),
            "http://net-zdremann-wc.appspot.com/status/42"
        );
    }
}
