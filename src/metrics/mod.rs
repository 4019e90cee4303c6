//! Prometheus metrics for the registry service.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `license_registry_http_requests_total` | Counter | `route`, `status` |
//! | `license_registry_rate_limited_total` | Counter | |
//! | `license_registry_transfers_total` | Counter | `outcome` |
//! | `license_registry_evictions_total` | Counter | |
//! | `license_registry_devices` | Gauge | |
//! | `license_registry_licenses` | Gauge | |
//!
//! The two gauges mirror the registry counters and are refreshed at scrape
//! time by [`Metrics::encode_text`] callers.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::registry::RegistryStats;

/// Maximum length for label values taken from request data.
pub const MAX_LABEL_VALUE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    RegistrationFailed(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    EncodingFailed(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Service metrics bound to their own Prometheus registry.
///
/// Cheap to clone; every handle shares the same underlying counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    rate_limited_total: IntCounter,
    transfers_total: IntCounterVec,
    evictions_total: IntCounter,
    devices: IntGauge,
    licenses: IntGauge,
}

impl Metrics {
    /// Create a fresh registry with every metric registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register.
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "license_registry_http_requests_total",
                "HTTP requests by route and status code",
            ),
            &["route", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let rate_limited_total = IntCounter::new(
            "license_registry_rate_limited_total",
            "Requests rejected by the rate limiter",
        )?;
        registry.register(Box::new(rate_limited_total.clone()))?;

        let transfers_total = IntCounterVec::new(
            Opts::new(
                "license_registry_transfers_total",
                "Token transfer requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let evictions_total = IntCounter::new(
            "license_registry_evictions_total",
            "Devices evicted for inactivity",
        )?;
        registry.register(Box::new(evictions_total.clone()))?;

        let devices = IntGauge::new("license_registry_devices", "Registered devices")?;
        registry.register(Box::new(devices.clone()))?;

        let licenses = IntGauge::new("license_registry_licenses", "Licenses with a holder")?;
        registry.register(Box::new(licenses.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            rate_limited_total,
            transfers_total,
            evictions_total,
            devices,
            licenses,
        })
    }

    pub fn request_completed(&self, route: &str, status: u16) {
        let route = truncate_label(route);
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[route, status.as_str()])
            .inc();
    }

    pub fn request_count(&self, route: &str, status: u16) -> u64 {
        let route = truncate_label(route);
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[route, status.as_str()])
            .get()
    }

    pub fn rate_limited(&self) {
        self.rate_limited_total.inc();
    }

    pub fn rate_limited_count(&self) -> u64 {
        self.rate_limited_total.get()
    }

    /// Record a transfer outcome (`approved` or the denial kind).
    pub fn transfer(&self, outcome: &str) {
        self.transfers_total
            .with_label_values(&[truncate_label(outcome)])
            .inc();
    }

    pub fn transfer_count(&self, outcome: &str) -> u64 {
        self.transfers_total
            .with_label_values(&[truncate_label(outcome)])
            .get()
    }

    pub fn evicted(&self, count: usize) {
        self.evictions_total.inc_by(count as u64);
    }

    pub fn eviction_count(&self) -> u64 {
        self.evictions_total.get()
    }

    /// Copy the registry counters into the gauges.
    pub fn observe_registry(&self, stats: &RegistryStats) {
        self.devices.set(stats.total_devices);
        self.licenses.set(stats.total_licenses);
    }

    /// Encode all metrics in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::EncodingFailed(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingFailed(e.to_string()))
    }
}

fn truncate_label(value: &str) -> &str {
    if value.len() <= MAX_LABEL_VALUE_LEN {
        return value;
    }
    let mut end = MAX_LABEL_VALUE_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
