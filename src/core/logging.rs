//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::settings::LogFormat;

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this twice is
/// harmless; the second call is ignored.
pub fn init(level: &str, format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	let result = match format {
		LogFormat::Json => tracing_subscriber::fmt()
			.json()
			.with_env_filter(filter)
			.with_current_span(false)
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_target(false)
			.try_init(),
	};

	if result.is_err() {
		tracing::debug!("tracing subscriber already installed");
	}
}
