//! Engine error taxonomy.
//!
//! # Design Decisions
//! - `InvalidConfiguration` is construction-time and fatal to the caller
//! - `Unavailable` is the terminal, user-visible request failure; transport
//!   errors are recovered by the retry loop and only surface here once the
//!   retry budget is exhausted
//! - Counter invariant violations (decrement below zero) are clamped and
//!   recorded for observability, never raised to the caller

use std::net::SocketAddr;
use thiserror::Error;

use crate::transport::TransportError;

/// Top-level error returned by the dispatch engine.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The supplied backend list or strategy settings are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The consistent-hash ring contains no nodes. Unreachable when the
    /// ring is populated from a non-empty registry at construction.
    #[error("consistent hash ring has no nodes")]
    EmptyRing,

    /// No backend could serve the request. Terminal; never retried further
    /// inside the engine.
    #[error("service unavailable: {0}")]
    Unavailable(#[from] Unavailable),
}

/// Why a request could not be served.
#[derive(Debug, Error)]
pub enum Unavailable {
    /// The strategy produced no candidate for this request.
    #[error("no eligible backend")]
    NoBackend,

    /// The selected backend failed its health probe.
    #[error("backend {0} failed health probe")]
    ProbeFailed(SocketAddr),

    /// Every attempt failed at the transport level.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}
