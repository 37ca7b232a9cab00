//! Tracing subscriber bootstrap for hosts that embed the engine.
//!
//! The engine only emits `tracing` events. Rust hosts usually install their
//! own subscriber; hosts on the other side of the FFI call [`init`] (through
//! `rowstate_init_logging`) to get formatted output on stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "rowstate_engine=info";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns false when a
/// global subscriber was already installed; calling this twice is harmless.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        // The first call may lose to another test's subscriber; the second
        // call can never succeed.
        init("rowstate_engine=debug");
        assert!(!init("rowstate_engine=debug"));
    }
}
