// Registry service: business rules over the device registry
//
// Registration, heartbeat, transfer admission and the eviction sweep.
// One instance is built at startup and shared by Arc with the HTTP layer
// and the eviction task.

mod error;
mod eviction;

pub use error::TransferError;
pub use eviction::EvictionTask;

use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RegistrySettings;
use crate::metrics::Metrics;
use crate::registry::{Device, DeviceRegistry, RegistryStats, TransferRequest};

/// Trim an id for log lines; full ids are long hex digests.
pub(crate) fn short_id(id: &str) -> &str {
    match id.char_indices().nth(16) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

pub struct RegistryService {
    registry: DeviceRegistry,
    settings: RegistrySettings,
    metrics: Metrics,
}

impl RegistryService {
    pub fn new(settings: RegistrySettings, metrics: Metrics) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            settings,
            metrics,
        }
    }

    /// Register a device, filling a missing public address from the
    /// address the request arrived on. Never fails.
    pub fn register_device(&self, mut device: Device, observed: Option<SocketAddr>) -> Device {
        if device.public_ip.is_empty() {
            if let Some(addr) = observed {
                device.public_ip = addr.to_string();
            }
        }

        let device = self.registry.register(device);
        info!(
            device = short_id(&device.device_id),
            license = %device.license_code,
            ip = %device.public_ip,
            "Device registered"
        );
        device
    }

    /// Returns false for unknown devices.
    pub fn device_heartbeat(&self, device_id: &str) -> bool {
        let alive = self.registry.heartbeat(device_id);
        if !alive {
            debug!(device = short_id(device_id), "Heartbeat from unknown device");
        }
        alive
    }

    pub fn license_holder(&self, license_code: &str) -> Option<Device> {
        self.registry.license_holder(license_code)
    }

    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.registry.device(device_id)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validate a transfer and, only if every check passes, make
    /// `to_device` the holder.
    ///
    /// Validation reads the holder and the write that follows are separate
    /// steps: two transfers of the same license racing against the same
    /// holder snapshot can both pass, and the later write wins.
    pub fn request_token_transfer(&self, request: &TransferRequest) -> Result<(), TransferError> {
        info!(
            from = short_id(&request.from_device),
            to = short_id(&request.to_device),
            license = %request.license_code,
            token = short_id(&request.token_id),
            "Token transfer requested"
        );

        if let Err(e) = self.validate_transfer(request) {
            warn!(
                license = %request.license_code,
                reason = e.kind(),
                "Token transfer denied: {}",
                e
            );
            self.metrics.transfer(e.kind());
            return Err(e);
        }

        self.registry
            .update_license_holder(&request.license_code, &request.to_device);
        self.metrics.transfer("approved");

        info!(
            license = %request.license_code,
            holder = short_id(&request.to_device),
            "Token transfer approved"
        );
        Ok(())
    }

    fn validate_transfer(&self, request: &TransferRequest) -> Result<(), TransferError> {
        let holder = self
            .registry
            .license_holder(&request.license_code)
            .ok_or_else(|| TransferError::LicenseNotFound(request.license_code.clone()))?;

        if holder.device_id != request.from_device {
            return Err(TransferError::HolderMismatch {
                from: request.from_device.clone(),
                license: request.license_code.clone(),
                holder: holder.device_id,
            });
        }

        let target = self
            .registry
            .device(&request.to_device)
            .ok_or_else(|| TransferError::TargetNotRegistered(request.to_device.clone()))?;

        if target.idle_for(Utc::now()) > self.settings.transfer_activity_window() {
            return Err(TransferError::TargetInactive(request.to_device.clone()));
        }

        if !request.token_data.is_empty() {
            validate_token_data(&request.token_data, &request.license_code)?;
        }

        Ok(())
    }

    /// Run one eviction pass and record it. Returns the number evicted.
    pub fn sweep_inactive(&self, timeout: Duration) -> usize {
        let evicted = self.registry.cleanup_inactive(timeout);
        self.metrics.evicted(evicted);
        if evicted > 0 {
            info!(count = evicted, "Evicted inactive devices");
        }
        evicted
    }
}

/// Coarse sanity check on an opaque token: it must mention the license.
///
/// Signature and trust-chain verification happen in the token engine on the
/// devices themselves; the registry never parses the token.
fn validate_token_data(token_data: &str, license_code: &str) -> Result<(), TransferError> {
    if !token_data.contains(license_code) {
        return Err(TransferError::TokenValidation(
            "token license code mismatch".to_string(),
        ));
    }
    Ok(())
}
