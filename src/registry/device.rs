// Device and transfer records shared by the registry and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A registered device and the license it last registered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub license_code: String,
    /// Address peers use to reach the device. Filled from the transport
    /// address when the device does not report one.
    #[serde(default)]
    pub public_ip: String,
    pub tcp_port: u16,
    /// Refreshed on every registration and heartbeat.
    pub last_seen: DateTime<Utc>,
}

impl Device {
    /// Build a device record stamped with the current time.
    pub fn new(
        device_id: impl Into<String>,
        license_code: impl Into<String>,
        public_ip: impl Into<String>,
        tcp_port: u16,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            license_code: license_code.into(),
            public_ip: public_ip.into(),
            tcp_port,
            last_seen: Utc::now(),
        }
    }

    /// Time elapsed between `last_seen` and `now`.
    ///
    /// A `last_seen` in the future (heartbeat landed after `now` was taken)
    /// counts as zero.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_seen)
            .to_std()
            .unwrap_or_default()
    }
}

/// A request to move license-holder status from one device to another.
///
/// Only validated and applied, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub token_id: String,
    /// Serialized offline token. Opaque to the registry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_data: String,
    pub from_device: String,
    pub to_device: String,
    pub license_code: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time copy of the registry counters.
///
/// Counters are maintained independently of the maps and may drift
/// slightly from the true map sizes under concurrent eviction and
/// registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_devices: i64,
    pub total_licenses: i64,
    pub registrations: i64,
    pub heartbeats: i64,
    pub queries: i64,
}
