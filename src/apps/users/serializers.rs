//! Request and response bodies for the user API

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::apps::users::models::User;

/// `POST /api/user/create/`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
	#[validate(email(message = "Enter a valid email address."))]
	pub email: String,

	#[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
	pub password: String,

	#[serde(default)]
	#[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
	pub name: String,
}

/// `PUT /api/user/me/`; every field is replaced
#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceUserRequest {
	#[validate(email(message = "Enter a valid email address."))]
	pub email: String,

	#[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
	pub password: String,

	#[serde(default)]
	#[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
	pub name: String,
}

/// `PATCH /api/user/me/`; only supplied fields change
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
	#[validate(email(message = "Enter a valid email address."))]
	pub email: Option<String>,

	#[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
	pub password: Option<String>,

	#[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
	pub name: Option<String>,
}

impl From<ReplaceUserRequest> for UpdateUserRequest {
	fn from(request: ReplaceUserRequest) -> Self {
		Self {
			email: Some(request.email),
			password: Some(request.password),
			name: Some(request.name),
		}
	}
}

/// Public representation of a user; the password never leaves the server
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
	pub email: String,
	pub name: String,
}

impl From<&User> for UserResponse {
	fn from(user: &User) -> Self {
		Self {
			email: user.email().clone(),
			name: user.name().clone(),
		}
	}
}

/// `POST /api/user/token/`
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
	#[validate(length(min = 1, message = "This field may not be blank."))]
	pub email: String,

	#[validate(length(min = 1, message = "This field may not be blank."))]
	pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
	pub token: String,
}
