//! Logging setup shared by the R-kive binaries

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let builder = fmt().with_env_filter(filter).with_target(true);

    // A subscriber may already be installed (tests, embedding binaries)
    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_ok() {
        tracing::info!(service = %config.service_name, "Tracing initialised");
    }
}
