//! `tracing` subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Install a formatted subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Returns `false` when a subscriber was already set.
pub fn init_tracing(default_level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_tracing(LogLevel::Debug);
        assert!(!init_tracing(LogLevel::Info));
    }
}
