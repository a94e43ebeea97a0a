//! Bearer token authentication
//!
//! Access tokens are HS256 JWTs whose subject is the user id. The
//! [`AuthenticationMiddleware`] resolves the `Authorization: Bearer <token>`
//! header into an [`AuthState`] on the request; requests without the header
//! pass through anonymously and are rejected later by the route permission.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use reinhardt::db::DatabaseConnection;
use reinhardt::http::AuthState;
use reinhardt::{Claims, Handler, JwtAuth, Middleware, Request, Response};

use crate::apps::users::models::User;
use crate::core::exception::{Error, Result};

/// Issues and verifies access tokens
pub struct TokenAuth {
	jwt: JwtAuth,
	lifetime: Duration,
}

impl TokenAuth {
	/// # Examples
	///
	/// ```
	/// use chrono::Duration;
	/// use recipe_app::apps::users::authentication::TokenAuth;
	///
	/// let auth = TokenAuth::new(b"secret", Duration::hours(1));
	/// let token = auth.issue(7, "cook@example.com", false).unwrap();
	/// assert_eq!(auth.verify(&token).unwrap(), 7);
	/// ```
	pub fn new(secret: &[u8], lifetime: Duration) -> Self {
		Self {
			jwt: JwtAuth::new(secret),
			lifetime,
		}
	}

	/// Signs a token for `user_id` valid for the configured lifetime
	pub fn issue(&self, user_id: i64, email: &str, is_superuser: bool) -> Result<String> {
		self.issue_with_lifetime(user_id, email, is_superuser, self.lifetime)
	}

	fn issue_with_lifetime(
		&self,
		user_id: i64,
		email: &str,
		is_superuser: bool,
		lifetime: Duration,
	) -> Result<String> {
		let claims = Claims::new(
			user_id.to_string(),
			email.to_string(),
			lifetime,
			is_superuser,
			is_superuser,
		);
		self.jwt
			.encode(&claims)
			.map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
	}

	/// Verifies signature and expiry and returns the user id
	pub fn verify(&self, token: &str) -> Result<i64> {
		let claims = self.jwt.verify_token(token).map_err(|e| {
			tracing::debug!(error = %e, "rejected token");
			Error::AuthenticationFailed("Invalid token.".to_string())
		})?;
		claims
			.sub
			.parse()
			.map_err(|_| Error::AuthenticationFailed("Invalid token.".to_string()))
	}
}

/// Resolves bearer tokens into an [`AuthState`]
pub struct AuthenticationMiddleware {
	conn: DatabaseConnection,
	tokens: Arc<TokenAuth>,
}

impl AuthenticationMiddleware {
	pub fn new(conn: DatabaseConnection, tokens: Arc<TokenAuth>) -> Self {
		Self { conn, tokens }
	}

	async fn authenticate(&self, header: &str) -> Result<AuthState> {
		let token = match header.split_once(' ') {
			Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
			_ => {
				return Err(Error::AuthenticationFailed(
					"Invalid token header.".to_string(),
				));
			}
		};
		if token.is_empty() || token.contains(' ') {
			return Err(Error::AuthenticationFailed(
				"Invalid token header.".to_string(),
			));
		}

		let user_id = self.tokens.verify(token)?;
		match User::get(&self.conn, user_id).await? {
			Some(user) if user.is_active() => Ok(AuthState::authenticated(
				user.id().to_string(),
				user.is_superuser(),
				user.is_active(),
			)),
			_ => Err(Error::AuthenticationFailed(
				"User inactive or deleted.".to_string(),
			)),
		}
	}
}

#[async_trait]
impl Middleware for AuthenticationMiddleware {
	async fn process(
		&self,
		request: Request,
		next: Arc<dyn Handler>,
	) -> reinhardt::Result<Response> {
		if let Some(header) = request.get_header("authorization") {
			match self.authenticate(&header).await {
				Ok(state) => request.extensions.insert(state),
				Err(e) => {
					tracing::warn!(path = %request.path(), error = %e, "authentication failed");
					return Ok(e.into_response());
				}
			}
		}

		next.handle(request).await
	}
}
