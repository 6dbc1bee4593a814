//! Daemon configuration.
//!
//! Everything here is a fixed policy value with an override: endpoint base
//! URLs, the request timeout, the watched rooms, refresh cadence, and the
//! estimate policy. The daemon loads overrides from `WASHWATCH_*`
//! environment variables (a `.env` file works too); library consumers build
//! the struct directly.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use rooms_status::model::{MachineKey, MachineStatus, MachineType, RoomId};
use rooms_status::provider::{CloudProvider, EsudsProvider};

use crate::scheduler::EstimatePolicy;
use crate::{Error, Result};

/// A machine watch registered at startup, standing in for the interactive
/// "notify me" action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSpec {
    pub machine: MachineKey,
    pub desired_status: MachineStatus,
}

impl FromStr for WatchSpec {
    type Err = Error;

    /// Format: `room:type:number:status`, e.g. `1310:washer:1:available`.
    fn from_str(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':');
        let (Some(room), Some(kind), Some(number), Some(status), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(Error::config(format!(
                "watch {spec:?} must look like room:type:number:status"
            )));
        };

        Ok(Self {
            machine: MachineKey {
                room_id: room
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("invalid room id in watch {spec:?}")))?,
                kind: MachineType::from_str(kind.trim())
                    .map_err(|_| Error::config(format!("invalid machine type in watch {spec:?}")))?,
                number: number
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("invalid machine number in watch {spec:?}")))?,
            },
            desired_status: MachineStatus::from_str(status.trim())
                .map_err(|_| Error::config(format!("invalid status in watch {spec:?}")))?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Base URL of the scraped room-status site.
    #[serde(default = "default_esuds_base_url")]
    pub esuds_base_url: String,
    /// Base URL of the JSON status mirror.
    #[serde(default = "default_cloud_base_url")]
    pub cloud_base_url: String,
    /// Read timeout for every status request, seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Rooms refreshed on the periodic cadence.
    #[serde(default)]
    pub rooms: Vec<RoomId>,
    /// Periodic refresh cadence, seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub estimates: EstimatePolicy,
    /// Watches registered at startup.
    #[serde(default)]
    pub watches: Vec<WatchSpec>,
    /// Optional webhook receiving ready alerts; log-only when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Serve synthetic data instead of hitting live backends.
    #[serde(default)]
    pub use_synthetic: bool,
    /// Directory for rolling log files; stdout-only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_esuds_base_url() -> String {
    EsudsProvider::DEFAULT_BASE_URL.to_string()
}

fn default_cloud_base_url() -> String {
    CloudProvider::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_refresh_interval_secs() -> u64 {
    10 * 60
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            esuds_base_url: default_esuds_base_url(),
            cloud_base_url: default_cloud_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            rooms: Vec::new(),
            refresh_interval_secs: default_refresh_interval_secs(),
            estimates: EstimatePolicy::default(),
            watches: Vec::new(),
            webhook_url: None,
            use_synthetic: false,
            log_dir: None,
        }
    }
}

impl WatcherConfig {
    /// Load the configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("WASHWATCH_ESUDS_BASE_URL") {
            config.esuds_base_url = value;
        }
        if let Ok(value) = std::env::var("WASHWATCH_CLOUD_BASE_URL") {
            config.cloud_base_url = value;
        }
        if let Ok(value) = std::env::var("WASHWATCH_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("WASHWATCH_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Ok(value) = std::env::var("WASHWATCH_ROOMS") {
            config.rooms = parse_rooms(&value)?;
        }
        if let Ok(value) = std::env::var("WASHWATCH_REFRESH_INTERVAL_SECS") {
            config.refresh_interval_secs =
                parse_number("WASHWATCH_REFRESH_INTERVAL_SECS", &value)?;
        }
        if let Ok(value) = std::env::var("WASHWATCH_WATCHES") {
            config.watches = parse_watches(&value)?;
        }
        if let Ok(value) = std::env::var("WASHWATCH_WEBHOOK_URL") {
            config.webhook_url = Some(value);
        }
        if let Ok(value) = std::env::var("WASHWATCH_USE_SYNTHETIC") {
            config.use_synthetic = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Ok(value) = std::env::var("WASHWATCH_LOG_DIR") {
            config.log_dir = Some(value);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("esuds base url", &self.esuds_base_url),
            ("cloud base url", &self.cloud_base_url),
        ] {
            Url::parse(value)
                .map_err(|error| Error::config(format!("invalid {name} {value:?}: {error}")))?;
        }
        if let Some(webhook) = &self.webhook_url {
            Url::parse(webhook)
                .map_err(|error| Error::config(format!("invalid webhook url {webhook:?}: {error}")))?;
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::config("refresh interval must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{name} must be a number, got {value:?}")))
}

/// Room lists come as comma-separated ids: `WASHWATCH_ROOMS=1310,1312`.
fn parse_rooms(value: &str) -> Result<Vec<RoomId>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| Error::config(format!("invalid room id {part:?}")))
        })
        .collect()
}

/// Watch lists come comma-separated: `WASHWATCH_WATCHES=42:washer:1:available`.
fn parse_watches(value: &str) -> Result<Vec<WatchSpec>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(WatchSpec::from_str)
        .collect()
}
