//! Tracing subscriber bootstrap

use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::ObservabilitySettings;

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the configured
/// level. Safe to call more than once; subsequent calls are no-ops.
pub fn init(settings: &ObservabilitySettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = if settings.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
