//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//! - Detect duplicate backends
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: DispatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DispatchConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("backend pool is empty")]
    EmptyBackendPool,

    #[error("invalid backend address: {0}")]
    InvalidBackendAddress(String),

    #[error("duplicate backend address: {0}")]
    DuplicateBackendAddress(String),

    #[error("backend {0} has zero weight")]
    ZeroWeight(String),

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("health check timeout must be greater than zero")]
    ZeroProbeTimeout,

    #[error("health check interval must be greater than zero")]
    ZeroProbeInterval,
}

/// Check the whole configuration, collecting every problem.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::EmptyBackendPool);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for backend in &config.backends {
        if backend.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBackendAddress(
                backend.address.clone(),
            ));
        }
        if !seen.insert(backend.address.as_str()) {
            errors.push(ValidationError::DuplicateBackendAddress(
                backend.address.clone(),
            ));
        }
        if backend.weight == 0 {
            errors.push(ValidationError::ZeroWeight(backend.address.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    // tokio::time::interval panics on a zero period, which would kill the
    // background monitor task in interval mode.
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroProbeInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
