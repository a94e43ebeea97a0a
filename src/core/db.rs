//! SQLite connection and schema migrations

use reinhardt::db::DatabaseConnection;
use reinhardt::db::orm::{QueryRow, QueryValue};
use serde::de::DeserializeOwned;

use crate::core::exception::{Error, Result};

/// Schema migrations in the order they are applied
const MIGRATIONS: &[(&str, &str)] = &[(
	"0001_initial",
	include_str!("../../migrations/0001_initial.sql"),
)];

/// Opens `database_url`, creating the database file if needed
///
/// Foreign keys are enforced on every pooled connection so that deleting a
/// user or recipe cascades to its rows.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
	Ok(DatabaseConnection::connect_sqlite(database_url).await?)
}

/// Applies pending migrations and returns the names that ran
pub async fn migrate(conn: &DatabaseConnection) -> Result<Vec<&'static str>> {
	conn.execute(
		"CREATE TABLE IF NOT EXISTS recipe_app_migrations (\
			name VARCHAR(255) PRIMARY KEY, \
			applied_at TEXT NOT NULL)",
		vec![],
	)
	.await?;

	let mut applied = Vec::new();
	for (name, sql) in MIGRATIONS {
		let done = conn
			.query(
				"SELECT name FROM recipe_app_migrations WHERE name = ?",
				vec![QueryValue::from(*name)],
			)
			.await?;
		if !done.is_empty() {
			continue;
		}

		let mut tx = conn.begin().await?;
		for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
			tx.execute(statement, vec![]).await?;
		}
		tx.execute(
			"INSERT INTO recipe_app_migrations (name, applied_at) VALUES (?, ?)",
			vec![
				QueryValue::from(*name),
				QueryValue::from(chrono::Utc::now().to_rfc3339()),
			],
		)
		.await?;
		tx.commit().await?;

		tracing::info!(migration = name, "applied migration");
		applied.push(*name);
	}
	Ok(applied)
}

/// Binds `NULL` for `None`
pub fn nullable(value: Option<&str>) -> QueryValue {
	value.map_or(QueryValue::Null, QueryValue::from)
}

/// Maps a row onto a model
pub fn from_row<T: DeserializeOwned>(row: QueryRow) -> Result<T> {
	serde_json::from_value(row.data)
		.map_err(|e| Error::Database(format!("Unexpected row shape: {}", e)))
}

/// Maps every row onto a model
pub fn from_rows<T: DeserializeOwned>(rows: Vec<QueryRow>) -> Result<Vec<T>> {
	rows.into_iter().map(from_row).collect()
}

/// First row mapped onto a model, if any
pub fn first<T: DeserializeOwned>(rows: Vec<QueryRow>) -> Result<Option<T>> {
	rows.into_iter().next().map(from_row).transpose()
}
