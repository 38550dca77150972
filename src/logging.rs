//! Structured logging setup.
//!
//! Log lines go to stderr so they never interleave with command output. The
//! filter comes from `RUST_LOG` and defaults to `info`; `UTAFM_LOG_FORMAT=json`
//! switches to one JSON object per line.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FORMAT_VAR: &str = "UTAFM_LOG_FORMAT";

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var(LOG_FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if result.is_err() {
        tracing::debug!(target: "cli", "tracing subscriber already installed");
    }
}
