// Registry counters: lock-free, adjusted alongside the maps

use std::sync::atomic::{AtomicI64, Ordering};

use super::device::RegistryStats;

/// Atomic counters backing [`RegistryStats`].
///
/// Never recomputed from the maps: a stats read stays O(1) at the cost of
/// possible drift while evictions and registrations interleave.
#[derive(Debug, Default)]
pub(crate) struct RegistryCounters {
    total_devices: AtomicI64,
    total_licenses: AtomicI64,
    registrations: AtomicI64,
    heartbeats: AtomicI64,
    queries: AtomicI64,
}

impl RegistryCounters {
    pub(crate) fn device_added(&self) {
        self.total_devices.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn device_removed(&self) {
        self.total_devices.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn license_added(&self) {
        self.total_licenses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn license_removed(&self) {
        self.total_licenses.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot current counters. Each field is read independently.
    pub(crate) fn snapshot(&self) -> RegistryStats {
        RegistryStats {
            total_devices: self.total_devices.load(Ordering::Relaxed),
            total_licenses: self.total_licenses.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
        }
    }
}
