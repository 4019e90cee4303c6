// Device registry: concurrent device and license-holder maps
//
// Two sharded maps (device_id -> Device, license_code -> holder device_id)
// plus independent counters. Every operation is per-key; nothing takes a
// registry-wide lock, so concurrent writers to the same key resolve as
// last-writer-wins.

mod device;
mod stats;

pub use device::{Device, RegistryStats, TransferRequest};

use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;

use stats::RegistryCounters;

/// In-memory source of truth for who holds which license.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<String, Device>,
    /// license_code -> device_id of the current holder
    licenses: DashMap<String, String>,
    stats: RegistryCounters,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a device and make it the holder of its license.
    ///
    /// No check against an existing holder: when two devices register the
    /// same license concurrently, whichever write lands last is the holder.
    /// Returns the stored record.
    pub fn register(&self, mut device: Device) -> Device {
        device.last_seen = Utc::now();

        if self
            .devices
            .insert(device.device_id.clone(), device.clone())
            .is_none()
        {
            self.stats.device_added();
        }

        if self
            .licenses
            .insert(device.license_code.clone(), device.device_id.clone())
            .is_none()
        {
            self.stats.license_added();
        }

        self.stats.record_registration();
        device
    }

    /// Refresh `last_seen` for a known device. Unknown ids return false
    /// and create nothing.
    pub fn heartbeat(&self, device_id: &str) -> bool {
        match self.devices.get_mut(device_id) {
            Some(mut device) => {
                device.last_seen = Utc::now();
                self.stats.record_heartbeat();
                true
            }
            None => false,
        }
    }

    /// Resolve license -> holder id -> device record.
    ///
    /// Returns `None` if either lookup misses, including when the holder was
    /// evicted between the two lookups.
    pub fn license_holder(&self, license_code: &str) -> Option<Device> {
        let holder_id = self.licenses.get(license_code)?.value().clone();
        let device = self.devices.get(&holder_id)?.value().clone();
        self.stats.record_query();
        Some(device)
    }

    pub fn device(&self, device_id: &str) -> Option<Device> {
        let device = self.devices.get(device_id)?.value().clone();
        self.stats.record_query();
        Some(device)
    }

    /// Point a license at a new holder unconditionally.
    ///
    /// A reassignment is counted as a registration.
    pub fn update_license_holder(&self, license_code: &str, device_id: &str) {
        if self
            .licenses
            .insert(license_code.to_string(), device_id.to_string())
            .is_none()
        {
            self.stats.license_added();
        }
        self.stats.record_registration();
    }

    /// Evict every device idle for longer than `timeout`.
    ///
    /// A device's license mapping is dropped only if it still names that
    /// device, checked and removed under the same shard lock. Staleness is
    /// re-checked at removal so a heartbeat landing mid-sweep keeps the
    /// device. Returns the number of devices evicted.
    pub fn cleanup_inactive(&self, timeout: Duration) -> usize {
        let now = Utc::now();

        // Collect first: removing while iterating would deadlock on the shard.
        let stale: Vec<String> = self
            .devices
            .iter()
            .filter(|entry| entry.idle_for(now) > timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for device_id in stale {
            let Some((_, device)) = self
                .devices
                .remove_if(&device_id, |_, device| device.idle_for(now) > timeout)
            else {
                continue;
            };

            if self
                .licenses
                .remove_if(&device.license_code, |_, holder| *holder == device_id)
                .is_some()
            {
                self.stats.license_removed();
            }

            self.stats.device_removed();
            evicted += 1;
        }

        evicted
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.snapshot()
    }

    /// Number of devices currently stored. O(shards), unlike [`Self::stats`].
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Move a device's `last_seen` back by `by`. Returns false if unknown.
    #[cfg(test)]
    pub(crate) fn backdate(&self, device_id: &str, by: chrono::Duration) -> bool {
        match self.devices.get_mut(device_id) {
            Some(mut device) => {
                device.last_seen = Utc::now() - by;
                true
            }
            None => false,
        }
    }
}
