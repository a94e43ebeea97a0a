//! Shared application state handed to every view

use std::sync::Arc;

use chrono::Duration;
use reinhardt::db::DatabaseConnection;
use reinhardt::{LocalStorage, Storage};

use crate::apps::users::authentication::TokenAuth;
use crate::config::settings::Settings;
use crate::core::db;
use crate::core::exception::Result;

#[derive(Clone)]
pub struct AppState {
	pub db: DatabaseConnection,
	pub storage: Arc<dyn Storage>,
	pub tokens: Arc<TokenAuth>,
	pub settings: Arc<Settings>,
}

impl AppState {
	/// Connects the database, applies migrations and stores uploads on disk
	pub async fn from_settings(settings: Settings) -> Result<Self> {
		let conn = db::connect(&settings.database_url).await?;
		db::migrate(&conn).await?;
		let storage = LocalStorage::new(settings.media_root.clone(), settings.media_url.clone());
		storage.ensure_base_dir().await?;
		Ok(Self::new(conn, Arc::new(storage), settings))
	}

	pub fn new(db: DatabaseConnection, storage: Arc<dyn Storage>, settings: Settings) -> Self {
		let tokens = TokenAuth::new(
			settings.secret_key.as_bytes(),
			Duration::hours(settings.token_lifetime_hours),
		);
		Self {
			db,
			storage,
			tokens: Arc::new(tokens),
			settings: Arc::new(settings),
		}
	}
}
