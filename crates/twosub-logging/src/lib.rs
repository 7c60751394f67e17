//! # twosub-logging
//!
//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`]: human-readable compact output on stderr
//! - [`init_json_subscriber`]: one JSON object per line on stderr
//! - [`capture_logs`]: in-memory capture for asserting on events in tests
//!
//! Both initializers honor `RUST_LOG` when it is set and fall back to the
//! given level otherwise. Only the first initializer call in a process
//! takes effect.

#![deny(unsafe_code)]

pub mod capture;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};

use tracing_subscriber::EnvFilter;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber with compact stderr output.
///
/// `level` is an `EnvFilter` directive such as `"info"` or
/// `"twosub_asr=debug,warn"`.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // no-op if a global subscriber is already set
    let _ = subscriber.try_init();
}

/// Initialize the global tracing subscriber with JSON lines on stderr.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .with_current_span(true);

    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
