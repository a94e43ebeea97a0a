//! User model
//!
//! Users are identified by email. The email's domain part is lower-cased on
//! creation while the local part keeps its case, so `Test@EXAMPLE.com` is
//! stored as `Test@example.com`.

use chrono::{DateTime, Utc};
use reinhardt::db::DatabaseConnection;
use reinhardt::db::orm::QueryValue;
use reinhardt::{Argon2Hasher, PasswordHasher, model};
use serde::{Deserialize, Serialize};

use crate::core::db;
use crate::core::exception::{Error, Result};

const USER_COLUMNS: &str =
	"id, email, password_hash, name, is_active, is_staff, is_superuser, date_joined";

const EMAIL_TAKEN: &str = "user with this email already exists.";

#[model(app_label = "users", table_name = "users")]
#[derive(Serialize, Deserialize)]
pub struct User {
	#[field(primary_key = true)]
	id: i64,

	#[field(max_length = 255, unique = true)]
	email: String,

	#[field(max_length = 255)]
	#[serde(skip_serializing)]
	password_hash: String,

	#[field(max_length = 255)]
	name: String,

	#[field(default = true)]
	is_active: bool,

	#[field(default = false)]
	is_staff: bool,

	#[field(default = false)]
	is_superuser: bool,

	#[field(auto_now_add = true)]
	date_joined: DateTime<Utc>,
}

/// Lower-cases the domain part of an email address
///
/// # Examples
///
/// ```
/// use recipe_app::apps::users::models::normalize_email;
///
/// assert_eq!(normalize_email("Test2@Example.com"), "Test2@example.com");
/// assert_eq!(normalize_email("TEST3@EXAMPLE.COM"), "TEST3@example.com");
/// assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
/// ```
pub fn normalize_email(email: &str) -> String {
	let email = email.trim();
	match email.rsplit_once('@') {
		Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
		None => email.to_string(),
	}
}

/// Fields for a new account
#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
	pub email: &'a str,
	pub password: &'a str,
	pub name: &'a str,
	pub is_staff: bool,
	pub is_superuser: bool,
}

fn email_taken(err: Error) -> Error {
	if err.is_unique_violation() {
		Error::field("email", EMAIL_TAKEN)
	} else {
		err
	}
}

impl User {
	/// Creates a regular account
	///
	/// # Errors
	///
	/// Returns a validation error on `email` when the email is empty or
	/// already taken.
	pub async fn create_user(
		conn: &DatabaseConnection,
		email: &str,
		password: &str,
		name: &str,
	) -> Result<User> {
		Self::insert(
			conn,
			NewUser {
				email,
				password,
				name,
				..Default::default()
			},
		)
		.await
	}

	/// Creates an account with staff and superuser rights
	pub async fn create_superuser(
		conn: &DatabaseConnection,
		email: &str,
		password: &str,
		name: &str,
	) -> Result<User> {
		Self::insert(
			conn,
			NewUser {
				email,
				password,
				name,
				is_staff: true,
				is_superuser: true,
			},
		)
		.await
	}

	async fn insert(conn: &DatabaseConnection, new_user: NewUser<'_>) -> Result<User> {
		let email = normalize_email(new_user.email);
		if email.is_empty() {
			return Err(Error::field("email", "Users must have an email address."));
		}
		let password_hash = hash_password(new_user.password)?;

		let rows = conn
			.query(
				"INSERT INTO users (email, password_hash, name, is_active, is_staff, is_superuser, date_joined) \
				 VALUES (?, ?, ?, 1, ?, ?, ?) RETURNING id",
				vec![
					QueryValue::from(email),
					QueryValue::from(password_hash),
					QueryValue::from(new_user.name),
					QueryValue::from(new_user.is_staff),
					QueryValue::from(new_user.is_superuser),
					QueryValue::from(Utc::now().to_rfc3339()),
				],
			)
			.await
			.map_err(|e| email_taken(e.into()))?;
		let id = rows
			.first()
			.and_then(|row| row.data.get("id"))
			.and_then(serde_json::Value::as_i64)
			.ok_or_else(|| Error::Database("INSERT returned no id".to_string()))?;

		Self::get(conn, id)
			.await?
			.ok_or_else(|| Error::Database(format!("user {} vanished after insert", id)))
	}

	pub async fn get(conn: &DatabaseConnection, id: i64) -> Result<Option<User>> {
		let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
		db::first(conn.query(&sql, vec![QueryValue::from(id)]).await?)
	}

	/// Looks up a user by email after normalizing it
	pub async fn get_by_email(conn: &DatabaseConnection, email: &str) -> Result<Option<User>> {
		let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
		db::first(
			conn.query(&sql, vec![QueryValue::from(normalize_email(email))])
				.await?,
		)
	}

	/// Persists `email`, `name` and `password_hash`
	pub async fn save(&self, conn: &DatabaseConnection) -> Result<()> {
		conn.execute(
			"UPDATE users SET email = ?, name = ?, password_hash = ? WHERE id = ?",
			vec![
				QueryValue::from(self.email.as_str()),
				QueryValue::from(self.name.as_str()),
				QueryValue::from(self.password_hash.as_str()),
				QueryValue::from(self.id),
			],
		)
		.await
		.map_err(|e| email_taken(e.into()))?;
		Ok(())
	}

	/// Replaces the stored hash; call [`User::save`] to persist it
	pub fn set_password(&mut self, password: &str) -> Result<()> {
		self.password_hash = hash_password(password)?;
		Ok(())
	}

	pub fn check_password(&self, password: &str) -> bool {
		Argon2Hasher::new()
			.verify(password, &self.password_hash)
			.unwrap_or(false)
	}
}

fn hash_password(password: &str) -> Result<String> {
	Argon2Hasher::new()
		.hash(password)
		.map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}
