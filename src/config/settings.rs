//! Project settings
//!
//! Values are merged from several sources, lowest priority first:
//!
//! 1. compiled defaults ([`Settings::default`])
//! 2. `settings/base.toml`
//! 3. `settings/{profile}.toml`
//! 4. `RECIPE_APP_*` environment variables
//!
//! The profile is read from `RECIPE_APP_ENV` and defaults to `local`.
//! Missing files are skipped.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use reinhardt::conf::settings::builder::{BuildError, GetError};
use reinhardt::{DefaultSource, EnvSource, Profile, SettingsBuilder, TomlFileSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RECIPE_APP_";

/// Variable selecting the settings profile
pub const PROFILE_VAR: &str = "RECIPE_APP_ENV";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error(transparent)]
	Build(#[from] BuildError),

	#[error("Invalid settings: {0}")]
	Deserialize(#[from] GetError),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub bind_address: SocketAddr,
	pub database_url: String,
	/// HMAC key used to sign access tokens
	pub secret_key: String,
	pub token_lifetime_hours: i64,
	/// Directory uploaded files are written to
	pub media_root: PathBuf,
	/// URL prefix uploaded files are served from
	pub media_url: String,
	/// Largest accepted request body, in bytes
	pub max_upload_size: usize,
	pub log_level: String,
	pub log_format: LogFormat,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: true,
			bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
			database_url: "sqlite://db.sqlite3".to_string(),
			secret_key: "insecure-change-me".to_string(),
			token_lifetime_hours: 24,
			media_root: PathBuf::from("media"),
			media_url: "/media/".to_string(),
			max_upload_size: 10 * 1024 * 1024,
			log_level: "info".to_string(),
			log_format: LogFormat::Pretty,
		}
	}
}

impl Settings {
	/// Loads settings from `./settings` and the process environment
	pub fn load() -> Result<Self, ConfigError> {
		let profile = std::env::var(PROFILE_VAR).unwrap_or_else(|_| "local".to_string());
		Self::load_from(Path::new("settings"), &profile)
	}

	/// Loads settings from `dir` for `profile`, overlaying `RECIPE_APP_*`
	/// variables
	///
	/// The rest of a variable name is lower-cased to form the key, so
	/// `RECIPE_APP_MAX_UPLOAD_SIZE` sets `max_upload_size`.
	pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
		let settings: Settings = SettingsBuilder::new()
			.profile(Profile::parse(profile))
			.add_source(Self::default_source()?)
			.add_source(TomlFileSource::new(dir.join("base.toml")))
			.add_source(TomlFileSource::new(dir.join(format!("{}.toml", profile))))
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX))
			.build()?
			.into_typed()?;
		settings.validate()?;
		Ok(settings)
	}

	fn default_source() -> Result<DefaultSource, ConfigError> {
		let defaults = serde_json::to_value(Settings::default())
			.map_err(|e| ConfigError::Invalid(e.to_string()))?;
		let mut source = DefaultSource::new();
		if let Value::Object(values) = defaults {
			for (key, value) in values {
				source = source.with_value(key, value);
			}
		}
		Ok(source)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.secret_key.is_empty() {
			return Err(ConfigError::Invalid("secret_key must not be empty".into()));
		}
		if self.token_lifetime_hours <= 0 {
			return Err(ConfigError::Invalid(
				"token_lifetime_hours must be positive".into(),
			));
		}
		if !self.debug && self.secret_key == Settings::default().secret_key {
			return Err(ConfigError::Invalid(
				"secret_key must be set when debug is off".into(),
			));
		}
		Ok(())
	}
}
