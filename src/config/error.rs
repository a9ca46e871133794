//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid gateway secret key format")]
    InvalidGatewayKey,

    #[error("Production requires a live gateway secret key")]
    TestGatewayKeyInProduction,

    #[error("Invalid gateway API base URL")]
    InvalidGatewayUrl,

    #[error("Job interval must be nonzero")]
    InvalidJobInterval,

    #[error("Lease TTL must be nonzero")]
    InvalidLeaseTtl,

    #[error("Unknown billing cycle override: {0}")]
    UnknownBillingCycle(String),

    #[error("Test-only billing cycle is not allowed in production")]
    TestCycleInProduction,
}
