//! Project-level views

use image::ImageFormat;
use reinhardt::utils::storage::StorageError;
use reinhardt::{Request, Response};

use crate::config::state::AppState;
use crate::core::exception::{Error, Result};

/// `GET /media/{*path}` serves stored uploads
pub async fn serve_media(state: AppState, request: Request) -> Result<Response> {
	let key = request
		.path_params
		.get("path")
		.cloned()
		.ok_or(Error::RouteNotFound)?;
	if key.split('/').any(|segment| segment == "..") {
		return Err(Error::RouteNotFound);
	}

	let file = match state.storage.read(&key).await {
		Ok(file) => file,
		Err(StorageError::NotFound(_) | StorageError::InvalidPath(_)) => {
			return Err(Error::RouteNotFound);
		}
		Err(e) => return Err(e.into()),
	};
	let content_type = ImageFormat::from_path(&key)
		.map(|format| format.to_mime_type())
		.unwrap_or("application/octet-stream");

	Ok(Response::ok()
		.with_header("Content-Type", content_type)
		.with_body(file.content))
}
