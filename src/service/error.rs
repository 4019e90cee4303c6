//! Transfer admission failures.

use thiserror::Error;

/// Why a token transfer was refused. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("license not found: {0}")]
    LicenseNotFound(String),

    #[error("device {from} does not hold license {license} (current holder: {holder})")]
    HolderMismatch {
        from: String,
        license: String,
        holder: String,
    },

    #[error("target device not registered: {0}")]
    TargetNotRegistered(String),

    #[error("target device not recently active: {0}")]
    TargetInactive(String),

    #[error("token validation failed: {0}")]
    TokenValidation(String),
}

impl TransferError {
    /// Short label used for metrics and logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LicenseNotFound(_) => "license_not_found",
            Self::HolderMismatch { .. } => "holder_mismatch",
            Self::TargetNotRegistered(_) => "target_not_registered",
            Self::TargetInactive(_) => "target_inactive",
            Self::TokenValidation(_) => "token_invalid",
        }
    }
}
