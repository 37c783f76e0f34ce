//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file → loader.rs (read + parse)
//!     → validation.rs (semantic checks, all errors reported)
//!     → schema.rs types consumed by the engine
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ConsistentHashConfig, DispatchConfig, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, ProbeMode, RetryConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
