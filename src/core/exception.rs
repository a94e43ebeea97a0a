//! Error types and their HTTP representation
//!
//! Every view returns [`Result<Response>`]. Errors are rendered into
//! DRF-style JSON bodies by [`Error::into_response`]: `{"detail": ...}` for
//! request-level failures and `{"field": ["message", ...]}` for validation.
//!
//! Framework errors raised by the router ([`reinhardt::Error`]) and by the
//! database layer are converted into this type so that every failure reaches
//! the client in the same shape.

use std::collections::BTreeMap;

use reinhardt::utils::storage::StorageError;
use reinhardt::{Method, Response, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

/// Result type used across views, stores and middleware
pub type Result<T> = std::result::Result<T, Error>;

/// Field name used for errors that are not tied to a single input field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation failures collected before rejecting a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
	fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
	/// Creates an empty error collection
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a collection holding a single message for `field`
	///
	/// # Examples
	///
	/// ```
	/// use recipe_app::core::exception::ValidationErrors;
	///
	/// let errors = ValidationErrors::single("title", "This field is required.");
	/// assert_eq!(errors.get("title").unwrap(), &["This field is required.".to_string()]);
	/// ```
	pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
		let mut errors = Self::new();
		errors.add(field, message);
		errors
	}

	/// Records a message for `field`
	pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.fields
			.entry(field.into())
			.or_default()
			.push(message.into());
	}

	/// Messages recorded for `field`
	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.fields.get(field).map(Vec::as_slice)
	}

	pub fn contains(&self, field: &str) -> bool {
		self.fields.contains_key(field)
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Converts the collection into `Err(Error::Validation)` when non-empty
	pub fn into_result(self) -> Result<()> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(Error::Validation(self))
		}
	}
}

impl From<validator::ValidationErrors> for ValidationErrors {
	fn from(errors: validator::ValidationErrors) -> Self {
		let mut collected = Self::new();
		for (field, field_errors) in errors.field_errors() {
			for error in field_errors {
				let message = error
					.message
					.as_ref()
					.map(|message| message.to_string())
					.unwrap_or_else(|| format!("Invalid value ({}).", error.code));
				collected.add(field.to_string(), message);
			}
		}
		collected
	}
}

impl std::fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let rendered: Vec<String> = self
			.fields
			.iter()
			.map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
			.collect();
		write!(f, "{}", rendered.join("; "))
	}
}

/// Application error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// No credentials were supplied for an endpoint that requires them
	#[error("Authentication credentials were not provided.")]
	NotAuthenticated,

	/// Credentials were supplied but could not be resolved to an active user
	#[error("{0}")]
	AuthenticationFailed(String),

	/// The record does not exist or is not owned by the caller
	#[error("No {0} matches the given query.")]
	NotFound(&'static str),

	/// No route matches the request path
	#[error("Not found.")]
	RouteNotFound,

	#[error("Validation failed: {0}")]
	Validation(ValidationErrors),

	/// The request body could not be parsed
	#[error("{0}")]
	ParseError(String),

	#[error("Method \"{method}\" not allowed.")]
	MethodNotAllowed { method: Method, allowed: Vec<Method> },

	#[error("Unsupported media type \"{0}\" in request.")]
	UnsupportedMediaType(String),

	#[error("Request body exceeds {limit} bytes.")]
	PayloadTooLarge { limit: usize },

	#[error("Database error: {0}")]
	Database(String),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Shorthand for a validation error on a single field
	pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
		Error::Validation(ValidationErrors::single(field, message))
	}

	/// HTTP status code this error is rendered with
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::NotAuthenticated | Error::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
			Error::NotFound(_) | Error::RouteNotFound => StatusCode::NOT_FOUND,
			Error::Validation(_) | Error::ParseError(_) => StatusCode::BAD_REQUEST,
			Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
			Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
			Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
			Error::Database(_) | Error::Storage(_) | Error::Internal(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	/// Renders the error as a JSON response
	///
	/// Server-side failures are logged here and replaced by a generic message
	/// so that SQL or filesystem details never reach the client.
	pub fn into_response(self) -> Response {
		let status = self.status_code();
		let body = match &self {
			Error::Validation(errors) => json!(errors),
			Error::Database(_) | Error::Storage(_) | Error::Internal(_) => {
				tracing::error!(error = %self, "request failed");
				json!({ "detail": "A server error occurred." })
			}
			other => json!({ "detail": other.to_string() }),
		};

		let mut response = json_response(status, &body);
		match self {
			Error::NotAuthenticated | Error::AuthenticationFailed(_) => {
				response = response.with_header("WWW-Authenticate", "Bearer");
			}
			Error::MethodNotAllowed { allowed, .. } => {
				let allow = allowed
					.iter()
					.map(Method::as_str)
					.collect::<Vec<_>>()
					.join(", ");
				response = response.with_header("Allow", &allow);
			}
			_ => {}
		}
		response
	}
}

/// Builds a JSON response from an already-serialized body
pub fn json_response(status: StatusCode, body: &Value) -> Response {
	Response::new(status)
		.with_header("Content-Type", "application/json")
		.with_body(body.to_string())
}

impl Error {
	/// Whether the error comes from a `UNIQUE` constraint
	pub fn is_unique_violation(&self) -> bool {
		matches!(self, Error::Database(message) if message.contains("UNIQUE constraint failed"))
	}
}

impl From<anyhow::Error> for Error {
	fn from(err: anyhow::Error) -> Self {
		Error::Database(format!("{:#}", err))
	}
}

impl From<reinhardt::db::Error> for Error {
	fn from(err: reinhardt::db::Error) -> Self {
		Error::Database(err.to_string())
	}
}

impl From<reinhardt::Error> for Error {
	/// Router failures keep their status; anything else is a server error
	fn from(err: reinhardt::Error) -> Self {
		match err {
			reinhardt::Error::NotFound(_) => Error::RouteNotFound,
			reinhardt::Error::MethodNotAllowed(_) => Error::MethodNotAllowed {
				method: Method::GET,
				allowed: Vec::new(),
			},
			other => Error::Internal(other.to_string()),
		}
	}
}

impl From<validator::ValidationErrors> for Error {
	fn from(errors: validator::ValidationErrors) -> Self {
		Error::Validation(errors.into())
	}
}

impl From<serde_json::Error> for Error {
	/// A missing field becomes a field error so clients see
	/// `{"title": ["This field is required."]}` instead of a parse message.
	fn from(err: serde_json::Error) -> Self {
		let message = err.to_string();
		let missing = message
			.strip_prefix("missing field `")
			.and_then(|rest| rest.split_once('`'))
			.map(|(field, _)| field.to_string());
		match missing {
			Some(field) => Error::field(field, "This field is required."),
			None => Error::ParseError(format!("JSON parse error - {}", message)),
		}
	}
}
