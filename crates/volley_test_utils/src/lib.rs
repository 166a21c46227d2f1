//! # Volley Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted collision world with lag-compensated history
//! - Two-peer network harness for reconciliation scenarios
//! - Determinism test harness
//! - Fixture helpers and property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod arena;
pub mod determinism;
pub mod fixtures;
pub mod netsim;

/// Re-export proptest for convenience.
pub use proptest;

/// Install a plain test subscriber for `tracing` output.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
