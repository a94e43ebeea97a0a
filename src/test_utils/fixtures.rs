//! rstest fixtures

use std::sync::Arc;

use reinhardt::db::DatabaseConnection;
use reinhardt::{APIClient, InMemoryStorage, Storage};
use rstest::fixture;
use tempfile::TempDir;

use crate::apps::recipes::images::UPLOAD_DIR;
use crate::apps::users::models::User;
use crate::config::settings::Settings;
use crate::config::state::AppState;
use crate::config::urls::application;
use crate::core::db;

const MULTIPART_BOUNDARY: &str = "----recipe-app-test-boundary";

/// Fresh application over a throwaway SQLite file and in-memory storage
///
/// `storage` shares its files with the storage the views write to.
pub struct TestContext {
	pub state: AppState,
	pub storage: InMemoryStorage,
	pub client: APIClient,
	_db_dir: TempDir,
}

impl TestContext {
	pub fn db(&self) -> &DatabaseConnection {
		&self.state.db
	}

	/// Sends a bearer token for `user` with every following request
	pub async fn authenticate(&self, user: &User) {
		let token = self
			.state
			.tokens
			.issue(user.id(), user.email(), user.is_superuser())
			.expect("token should be issued");
		self.client
			.set_header("Authorization", format!("Bearer {}", token))
			.await
			.expect("header should be valid");
	}

	/// Drops the bearer token and every other default header
	pub async fn logout(&self) {
		self.client.cleanup().await;
	}

	/// Keys of the stored recipe images
	pub async fn stored_images(&self) -> Vec<String> {
		let mut keys: Vec<String> = self
			.storage
			.list(UPLOAD_DIR)
			.await
			.expect("storage should list")
			.into_iter()
			.map(|file| {
				if file.path.starts_with(UPLOAD_DIR) {
					file.path
				} else {
					format!("{}/{}", UPLOAD_DIR, file.path)
				}
			})
			.collect();
		keys.sort();
		keys
	}
}

/// `multipart/form-data` body built part by part
#[derive(Debug, Default)]
pub struct MultipartBody {
	body: Vec<u8>,
}

impl MultipartBody {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn text(mut self, name: &str, value: &str) -> Self {
		self.body.extend_from_slice(
			format!(
				"--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
			)
			.as_bytes(),
		);
		self
	}

	pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
		self.body.extend_from_slice(
			format!(
				"--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
			)
			.as_bytes(),
		);
		self.body.extend_from_slice(data);
		self.body.extend_from_slice(b"\r\n");
		self
	}

	pub fn content_type(&self) -> String {
		format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
	}

	pub fn finish(mut self) -> Vec<u8> {
		self.body
			.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
		self.body
	}
}

pub fn test_settings() -> Settings {
	Settings {
		secret_key: "test-secret".to_string(),
		..Settings::default()
	}
}

#[fixture]
pub async fn test_context() -> TestContext {
	let db_dir = TempDir::new().expect("temporary directory should be created");
	let db_path = db_dir.path().join("test.sqlite3");
	let conn = db::connect(&db_path.to_string_lossy())
		.await
		.expect("test database should open");
	db::migrate(&conn).await.expect("migrations should apply");

	let settings = test_settings();
	let storage = InMemoryStorage::new("memory", settings.media_url.clone());
	let state = AppState::new(conn, Arc::new(storage.clone()), settings);
	let handler = application(state.clone()).expect("routes should compile");

	TestContext {
		client: APIClient::from_handler(handler),
		storage,
		state,
		_db_dir: db_dir,
	}
}
