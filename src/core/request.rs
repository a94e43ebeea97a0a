//! Request helpers shared by the views
//!
//! [`RequestExt`] adds the lookups every view needs on top of
//! [`reinhardt::Request`]: the authenticated user, typed path parameters and
//! body parsing. Bodies are accepted as JSON, `application/x-www-form-urlencoded`
//! or `multipart/form-data`; the two form encodings are flattened into the
//! same JSON object a JSON client would send so that serializers only deal
//! with one representation.

use std::str::FromStr;

use bytes::Bytes;
use futures_util::future::ready;
use futures_util::stream::once;
use multer::Multipart;
use reinhardt::Request;
use reinhardt::http::AuthState;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::exception::{Error, Result};

/// File part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
	pub file_name: String,
	pub data: Bytes,
}

/// Parsed request body
#[derive(Debug, Clone)]
pub enum RequestData {
	Json(Value),
	/// Form or multipart body; keys keep their order and may repeat
	Form {
		fields: Vec<(String, String)>,
		files: Vec<(String, UploadedFile)>,
	},
}

impl RequestData {
	/// File submitted under `name`
	pub fn file(&self, name: &str) -> Option<&UploadedFile> {
		match self {
			RequestData::Json(_) => None,
			RequestData::Form { files, .. } => files
				.iter()
				.find(|(field, _)| field == name)
				.map(|(_, file)| file),
		}
	}

	/// Whether a non-file value was submitted under `name`
	pub fn has_value(&self, name: &str) -> bool {
		match self {
			RequestData::Json(value) => value.get(name).is_some(),
			RequestData::Form { fields, .. } => fields.iter().any(|(field, _)| field == name),
		}
	}

	/// Converts the body into a JSON object
	///
	/// Form values are strings; every key named in `list_fields` is collected
	/// into an array. Items of those arrays become ids when numeric, objects
	/// when they hold a JSON object and `{"name": value}` otherwise. Other keys
	/// keep their last value.
	///
	/// # Examples
	///
	/// ```
	/// use recipe_app::core::request::RequestData;
	/// use serde_json::json;
	///
	/// let data = RequestData::Form {
	/// 	fields: vec![
	/// 		("title".into(), "Soup".into()),
	/// 		("tags".into(), "3".into()),
	/// 		("tags".into(), "Vegan".into()),
	/// 	],
	/// 	files: Vec::new(),
	/// };
	/// let object = data.into_object(&["tags"]).unwrap();
	///
	/// assert_eq!(object["title"], "Soup");
	/// assert_eq!(object["tags"], json!([3, {"name": "Vegan"}]));
	/// ```
	pub fn into_object(self, list_fields: &[&str]) -> Result<Map<String, Value>> {
		match self {
			RequestData::Json(Value::Object(object)) => Ok(object),
			RequestData::Json(other) => Err(Error::field(
				crate::core::exception::NON_FIELD_ERRORS,
				format!(
					"Invalid data. Expected a dictionary, but got {}.",
					json_kind(&other)
				),
			)),
			RequestData::Form { fields, .. } => {
				let mut object = Map::new();
				for name in list_fields {
					if fields.iter().any(|(field, _)| field == name) {
						object.insert(name.to_string(), Value::Array(Vec::new()));
					}
				}
				for (field, value) in fields {
					if list_fields.contains(&field.as_str()) {
						if let Some(Value::Array(items)) = object.get_mut(&field) {
							items.push(coerce_list_item(&value));
						}
					} else {
						object.insert(field, Value::String(value));
					}
				}
				Ok(object)
			}
		}
	}
}

fn coerce_list_item(raw: &str) -> Value {
	let trimmed = raw.trim();
	if let Ok(id) = trimmed.parse::<i64>() {
		return Value::from(id);
	}
	if trimmed.starts_with('{')
		&& let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed)
	{
		return value;
	}
	serde_json::json!({ "name": raw })
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "int",
		Value::String(_) => "str",
		Value::Array(_) => "list",
		Value::Object(_) => "dict",
	}
}

/// View-side accessors on [`Request`]
pub trait RequestExt {
	/// Id of the authenticated caller, or [`Error::NotAuthenticated`]
	fn user_id(&self) -> Result<i64>;

	/// Media type of the body without parameters
	fn media_type(&self) -> Option<String>;

	/// Decoded query string parameter
	fn query_param(&self, name: &str) -> Option<String>;

	/// Parses a captured path parameter
	///
	/// A value that does not parse is treated like an unmatched route, the
	/// same way an `<int:pk>` converter would refuse it.
	fn path_param<T: FromStr>(&self, name: &str) -> Result<T>;

	/// Deserializes a JSON body; an empty body reads as `{}`
	fn parse_json<T: DeserializeOwned>(&self) -> Result<T>;

	/// Parses the body according to its `Content-Type`
	fn parse_data(&self) -> impl Future<Output = Result<RequestData>> + Send;
}

impl RequestExt for Request {
	fn user_id(&self) -> Result<i64> {
		AuthState::from_extensions(&self.extensions)
			.filter(AuthState::is_authenticated)
			.and_then(|state| state.user_id().parse().ok())
			.ok_or(Error::NotAuthenticated)
	}

	fn media_type(&self) -> Option<String> {
		self.get_header("content-type").map(|value| {
			value
				.split(';')
				.next()
				.unwrap_or_default()
				.trim()
				.to_ascii_lowercase()
		})
	}

	fn query_param(&self, name: &str) -> Option<String> {
		self.decoded_query_params().remove(name)
	}

	fn path_param<T: FromStr>(&self, name: &str) -> Result<T> {
		self.path_params
			.get(name)
			.and_then(|raw| raw.parse().ok())
			.ok_or(Error::RouteNotFound)
	}

	fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
		let body = self.body();
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(serde_json::from_str("{}")?);
		}
		match self.media_type().as_deref() {
			Some("application/json") | None => Ok(serde_json::from_slice(body)?),
			Some(other) => Err(Error::UnsupportedMediaType(other.to_string())),
		}
	}

	async fn parse_data(&self) -> Result<RequestData> {
		let body = self.body().clone();
		match self.media_type().as_deref() {
			Some("application/json") | None => {
				if body.iter().all(u8::is_ascii_whitespace) {
					return Ok(RequestData::Json(Value::Object(Map::new())));
				}
				Ok(RequestData::Json(serde_json::from_slice(&body)?))
			}
			Some("application/x-www-form-urlencoded") => {
				let fields = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body)
					.map_err(|e| Error::ParseError(format!("Form parse error - {}", e)))?;
				Ok(RequestData::Form {
					fields,
					files: Vec::new(),
				})
			}
			Some("multipart/form-data") => {
				let content_type = self.get_header("content-type").unwrap_or_default();
				parse_multipart(&content_type, body).await
			}
			Some(other) => Err(Error::UnsupportedMediaType(other.to_string())),
		}
	}
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<RequestData> {
	let boundary = multer::parse_boundary(content_type)
		.map_err(|e| Error::ParseError(format!("Multipart form parse error - {}", e)))?;
	let mut multipart = Multipart::new(once(ready(Ok::<_, std::io::Error>(body))), boundary);

	let mut fields = Vec::new();
	let mut files = Vec::new();
	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| Error::ParseError(format!("Multipart form parse error - {}", e)))?
	{
		let name = field.name().unwrap_or_default().to_string();
		let file_name = field.file_name().map(str::to_string);
		let data = field
			.bytes()
			.await
			.map_err(|e| Error::ParseError(format!("Multipart form parse error - {}", e)))?;
		match file_name {
			Some(file_name) => files.push((name, UploadedFile { file_name, data })),
			None => fields.push((name, String::from_utf8_lossy(&data).into_owned())),
		}
	}
	Ok(RequestData::Form { fields, files })
}
