//! Tracing bootstrap.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::ClientSettings;

/// Install the global subscriber, filtered by `RUST_LOG`.
///
/// Emits JSON lines unless [`ClientSettings::log_json`] is off. A subscriber
/// that is already installed is left in place and the failure is logged.
pub fn init_tracing(settings: &ClientSettings) {
    let builder = fmt().with_env_filter(EnvFilter::from_default_env());
    let result = if settings.log_json() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn repeated_initialisation_does_not_panic() {
        let settings = ClientSettings {
            login_path: None,
            home_path: None,
            log_json: Some(false),
        };
        init_tracing(&settings);
        init_tracing(&settings);
    }
}
