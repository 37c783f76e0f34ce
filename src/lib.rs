//! Backend selection and dispatch engine.
//!
//! Routes inbound HTTP requests across a pool of backend servers, choosing
//! a target per request via a configurable distribution policy, tracking
//! per-backend load state, and retrying on transport failure.
//!
//! # Data Flow
//! ```text
//! Request → server (axum glue)
//!     → dispatch::Dispatcher
//!         → balancer (select backend from registry snapshot)
//!         → health (probe candidate)
//!         → registry (account connections / in-flight)
//!         → transport (forward request)
//!         → on transport failure: backoff, re-select, retry
//!     → Response (or ServiceUnavailable)
//! ```

pub mod balancer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod observability;
pub mod registry;
pub mod server;
pub mod transport;

pub use config::DispatchConfig;
pub use dispatch::{DispatchRequest, Dispatcher};
pub use error::DispatchError;
pub use registry::{Backend, Registry};
