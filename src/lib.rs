// License registry - tracks which device holds each license token
// Library exports

pub mod config;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod service;

pub use registry::{Device, DeviceRegistry, RegistryStats, TransferRequest};
pub use server::{create_router, AppState, RegistryServer};
pub use service::{EvictionTask, RegistryService, TransferError};
