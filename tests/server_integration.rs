//! End-to-end tests over a real TCP socket
//!
//! Each test boots reinhardt's [`HttpServer`] on an ephemeral port over a
//! throwaway SQLite file and drives it with `reqwest`.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageBuffer, ImageFormat, Rgb};
use recipe_app::config::settings::Settings;
use recipe_app::config::state::AppState;
use recipe_app::config::urls::application;
use recipe_app::core::db;
use reinhardt::InMemoryStorage;
use reinhardt::server::{HttpServer, ShutdownCoordinator};
use reqwest::StatusCode;
use rstest::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const MAX_BODY_SIZE: usize = 64 * 1024;

struct TestServer {
	addr: SocketAddr,
	client: reqwest::Client,
	coordinator: ShutdownCoordinator,
	handle: JoinHandle<()>,
	_db_dir: TempDir,
}

impl TestServer {
	fn url(&self, path: &str) -> String {
		format!("http://{}{}", self.addr, path)
	}

	async fn stop(self) {
		self.coordinator.shutdown();
		self.handle.await.expect("server task should not panic");
	}

	/// Registers a user and returns an access token
	async fn signup(&self, email: &str) -> String {
		let created = self
			.client
			.post(self.url("/api/user/create/"))
			.json(&json!({"email": email, "password": "testpass123", "name": "Test Name"}))
			.send()
			.await
			.unwrap();
		assert_eq!(created.status(), StatusCode::CREATED);

		let token: Value = self
			.client
			.post(self.url("/api/user/token/"))
			.json(&json!({"email": email, "password": "testpass123"}))
			.send()
			.await
			.unwrap()
			.json()
			.await
			.unwrap();
		token["token"].as_str().unwrap().to_string()
	}
}

#[fixture]
async fn server() -> TestServer {
	let settings = Settings {
		secret_key: "integration-secret".to_string(),
		max_upload_size: MAX_BODY_SIZE,
		..Settings::default()
	};
	let db_dir = TempDir::new().unwrap();
	let conn = db::connect(&db_dir.path().join("db.sqlite3").to_string_lossy())
		.await
		.unwrap();
	db::migrate(&conn).await.unwrap();
	let storage = Arc::new(InMemoryStorage::new("memory", settings.media_url.clone()));
	let handler = application(AppState::new(conn, storage, settings)).unwrap();

	// Reserve a free port, then hand it to the server
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
	let server_coordinator = coordinator.clone();
	let handle = tokio::spawn(async move {
		let _ = HttpServer::new(handler)
			.listen_with_shutdown(addr, server_coordinator)
			.await;
	});
	tokio::time::sleep(Duration::from_millis(100)).await;

	TestServer {
		addr,
		client: reqwest::Client::new(),
		coordinator,
		handle,
		_db_dir: db_dir,
	}
}

fn png_bytes() -> Vec<u8> {
	let img = ImageBuffer::from_pixel(4, 4, Rgb([10u8, 200, 30]));
	let mut buffer = Cursor::new(Vec::new());
	img.write_to(&mut buffer, ImageFormat::Png).unwrap();
	buffer.into_inner()
}

#[rstest]
#[tokio::test]
async fn test_recipe_lifecycle_over_http(#[future] server: TestServer) {
	let server = server.await;
	let token = server.signup("cook@example.com").await;

	let created = server
		.client
		.post(server.url("/api/recipe/recipes/"))
		.bearer_auth(&token)
		.json(&json!({
			"title": "Pad Thai",
			"time_minutes": 25,
			"price": "7.5",
			"tags": [{"name": "Thai"}],
		}))
		.send()
		.await
		.unwrap();
	assert_eq!(created.status(), StatusCode::CREATED);
	let created: Value = created.json().await.unwrap();
	assert_eq!(created["price"], "7.50");
	assert_eq!(created["tags"][0]["name"], "Thai");

	let list: Value = server
		.client
		.get(server.url("/api/recipe/recipes/"))
		.bearer_auth(&token)
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(list.as_array().unwrap().len(), 1);
	assert_eq!(list[0]["id"], created["id"]);

	let me: Value = server
		.client
		.get(server.url("/api/user/me/"))
		.bearer_auth(&token)
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(me, json!({"email": "cook@example.com", "name": "Test Name"}));

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_form_encoded_recipe_over_http(#[future] server: TestServer) {
	let server = server.await;
	let token = server.signup("form@example.com").await;

	let created = server
		.client
		.post(server.url("/api/recipe/recipes/"))
		.bearer_auth(&token)
		.form(&[
			("title", "Miso soup"),
			("time_minutes", "15"),
			("price", "3"),
			("tags", "Japanese"),
			("tags", "Soup"),
		])
		.send()
		.await
		.unwrap();

	assert_eq!(created.status(), StatusCode::CREATED);
	let created: Value = created.json().await.unwrap();
	assert_eq!(created["price"], "3.00");
	assert_eq!(created["tags"].as_array().unwrap().len(), 2);

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_anonymous_request_is_challenged(#[future] server: TestServer) {
	let server = server.await;

	let response = server
		.client
		.get(server.url("/api/recipe/tags/"))
		.send()
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(response.headers()["www-authenticate"], "Bearer");
	let body: Value = response.json().await.unwrap();
	assert_eq!(body["detail"], "Authentication credentials were not provided.");

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_invalid_token_is_rejected(#[future] server: TestServer) {
	let server = server.await;

	let response = server
		.client
		.get(server.url("/api/recipe/recipes/"))
		.bearer_auth("not-a-token")
		.send()
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_image_upload_and_download(#[future] server: TestServer) {
	let server = server.await;
	let token = server.signup("baker@example.com").await;
	let recipe: Value = server
		.client
		.post(server.url("/api/recipe/recipes/"))
		.bearer_auth(&token)
		.json(&json!({"title": "Bread", "time_minutes": 90, "price": 2}))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	let data = png_bytes();

	let part = reqwest::multipart::Part::bytes(data.clone()).file_name("bread.png");
	let form = reqwest::multipart::Form::new().part("image", part);
	let uploaded = server
		.client
		.post(server.url(&format!(
			"/api/recipe/recipes/{}/upload-image/",
			recipe["id"]
		)))
		.bearer_auth(&token)
		.multipart(form)
		.send()
		.await
		.unwrap();
	assert_eq!(uploaded.status(), StatusCode::OK);
	let uploaded: Value = uploaded.json().await.unwrap();
	let image_url = uploaded["image"].as_str().unwrap().to_string();

	let downloaded = server.client.get(server.url(&image_url)).send().await.unwrap();
	assert_eq!(downloaded.status(), StatusCode::OK);
	assert_eq!(downloaded.headers()["content-type"], "image/png");
	assert_eq!(downloaded.bytes().await.unwrap().as_ref(), data.as_slice());

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_oversized_body_is_rejected(#[future] server: TestServer) {
	let server = server.await;
	let token = server.signup("big@example.com").await;

	let response = server
		.client
		.post(server.url("/api/recipe/recipes/"))
		.bearer_auth(&token)
		.header("Content-Type", "application/json")
		.body(vec![b' '; MAX_BODY_SIZE * 2])
		.send()
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

	server.stop().await;
}

#[rstest]
#[tokio::test]
async fn test_shutdown_stops_accepting_connections(#[future] server: TestServer) {
	let server = server.await;
	let addr = server.addr;

	server.stop().await;

	assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
