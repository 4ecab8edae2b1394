//! Structured logging setup
//!
//! `PHOTOLOAD_LOG` takes an `EnvFilter` directive string and wins over the
//! verbosity passed on the command line.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV_VAR: &str = "PHOTOLOAD_LOG";

/// Filter directive for a `-v` count
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true),
        )
        .with(filter)
        .try_init();

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized");
    }
}
