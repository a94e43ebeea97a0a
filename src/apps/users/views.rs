//! User API views
//!
//! - `POST /api/user/create/` registers an account
//! - `POST /api/user/token/` exchanges credentials for an access token
//! - `GET|PUT|PATCH /api/user/me/` manages the caller's own account

use reinhardt::{Request, Response};
use validator::Validate;

use crate::apps::users::models::{User, normalize_email};
use crate::apps::users::serializers::{
	CreateUserRequest, ReplaceUserRequest, TokenRequest, TokenResponse, UpdateUserRequest,
	UserResponse,
};
use crate::config::state::AppState;
use crate::core::exception::{Error, NON_FIELD_ERRORS, Result};
use crate::core::request::RequestExt;

pub async fn create_user(state: AppState, request: Request) -> Result<Response> {
	let payload: CreateUserRequest = request.parse_json()?;
	payload.validate()?;

	if User::get_by_email(&state.db, &payload.email).await?.is_some() {
		return Err(Error::field("email", "user with this email already exists."));
	}
	let user =
		User::create_user(&state.db, &payload.email, &payload.password, &payload.name).await?;
	tracing::info!(user_id = user.id(), "user created");

	Ok(Response::created().with_json(&UserResponse::from(&user))?)
}

pub async fn create_token(state: AppState, request: Request) -> Result<Response> {
	let payload: TokenRequest = request.parse_json()?;
	payload.validate()?;

	let user = User::get_by_email(&state.db, &payload.email)
		.await?
		.filter(|user| user.is_active() && user.check_password(&payload.password))
		.ok_or_else(|| {
			Error::field(
				NON_FIELD_ERRORS,
				"Unable to authenticate with provided credentials.",
			)
		})?;

	let token = state
		.tokens
		.issue(user.id(), user.email(), user.is_superuser())?;
	Ok(Response::ok().with_json(&TokenResponse { token })?)
}

async fn current_user(state: &AppState, request: &Request) -> Result<User> {
	let user_id = request.user_id()?;
	User::get(&state.db, user_id)
		.await?
		.ok_or(Error::NotAuthenticated)
}

pub async fn retrieve_me(state: AppState, request: Request) -> Result<Response> {
	let user = current_user(&state, &request).await?;
	Ok(Response::ok().with_json(&UserResponse::from(&user))?)
}

pub async fn update_me(state: AppState, request: Request) -> Result<Response> {
	let payload: ReplaceUserRequest = request.parse_json()?;
	payload.validate()?;
	apply_update(state, request, payload.into()).await
}

pub async fn partial_update_me(state: AppState, request: Request) -> Result<Response> {
	let payload: UpdateUserRequest = request.parse_json()?;
	payload.validate()?;
	apply_update(state, request, payload).await
}

async fn apply_update(
	state: AppState,
	request: Request,
	payload: UpdateUserRequest,
) -> Result<Response> {
	let mut user = current_user(&state, &request).await?;

	if let Some(email) = payload.email {
		user.set_email(normalize_email(&email));
	}
	if let Some(name) = payload.name {
		user.set_name(name);
	}
	if let Some(password) = payload.password {
		user.set_password(&password)?;
	}
	user.save(&state.db).await?;

	Ok(Response::ok().with_json(&UserResponse::from(&user))?)
}
