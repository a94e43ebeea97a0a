//! Recipe image validation and storage keys

use image::ImageFormat;
use uuid::Uuid;

use crate::core::exception::{Error, Result};

/// Storage prefix of recipe images
pub const UPLOAD_DIR: &str = "uploads/recipe";

const INVALID_IMAGE: &str =
	"Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Checks that `data` decodes as an image and returns its format
///
/// The format is detected from the content, never from the client's file
/// name or content type.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat> {
	if data.is_empty() {
		return Err(Error::field("image", "The submitted file is empty."));
	}
	let format = image::guess_format(data).map_err(|_| Error::field("image", INVALID_IMAGE))?;
	image::load_from_memory_with_format(data, format).map_err(|e| {
		tracing::debug!(error = %e, "rejected image upload");
		Error::field("image", INVALID_IMAGE)
	})?;
	Ok(format)
}

/// Fresh storage key for an image of `format`
///
/// # Examples
///
/// ```
/// use image::ImageFormat;
/// use recipe_app::apps::recipes::images::upload_key;
///
/// let key = upload_key(ImageFormat::Jpeg);
/// assert!(key.starts_with("uploads/recipe/"));
/// assert!(key.ends_with(".jpg"));
/// ```
pub fn upload_key(format: ImageFormat) -> String {
	let extension = format.extensions_str().first().copied().unwrap_or("bin");
	format!("{}/{}.{}", UPLOAD_DIR, Uuid::new_v4(), extension)
}
