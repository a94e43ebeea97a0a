//! Recipe, tag and ingredient records
//!
//! Every query is scoped by the owning user's id. A record owned by someone
//! else is indistinguishable from one that does not exist.
//!
//! Tags and ingredients share one shape; the [`Label`] trait carries the
//! table names so the label queries below are written once.

use std::collections::HashMap;

use reinhardt::db::DatabaseConnection;
use reinhardt::db::orm::{QueryRow, QueryValue, TransactionExecutor};
use reinhardt::model;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::db;
use crate::core::exception::{Error, Result};

#[model(app_label = "recipes", table_name = "tags")]
#[derive(Serialize, Deserialize)]
pub struct Tag {
	#[field(primary_key = true)]
	id: i64,

	#[serde(skip_serializing)]
	user_id: i64,

	#[field(max_length = 255)]
	name: String,
}

#[model(app_label = "recipes", table_name = "ingredients")]
#[derive(Serialize, Deserialize)]
pub struct Ingredient {
	#[field(primary_key = true)]
	id: i64,

	#[serde(skip_serializing)]
	user_id: i64,

	#[field(max_length = 255)]
	name: String,
}

/// A tag or an ingredient
pub trait Label: Serialize + DeserializeOwned + Send + Sync + 'static {
	/// Model name used in "not found" messages
	const MODEL_NAME: &'static str;
	/// Lower-case name used in validation messages
	const VERBOSE_NAME: &'static str;
	/// Recipe field holding labels of this kind
	const FIELD_NAME: &'static str;
	const TABLE: &'static str;
	const JOIN_TABLE: &'static str;
	const JOIN_COLUMN: &'static str;

	fn label_id(&self) -> i64;
	fn label_name(&self) -> &str;
}

impl Label for Tag {
	const MODEL_NAME: &'static str = "Tag";
	const VERBOSE_NAME: &'static str = "tag";
	const FIELD_NAME: &'static str = "tags";
	const TABLE: &'static str = "tags";
	const JOIN_TABLE: &'static str = "recipe_tags";
	const JOIN_COLUMN: &'static str = "tag_id";

	fn label_id(&self) -> i64 {
		self.id
	}

	fn label_name(&self) -> &str {
		&self.name
	}
}

impl Label for Ingredient {
	const MODEL_NAME: &'static str = "Ingredient";
	const VERBOSE_NAME: &'static str = "ingredient";
	const FIELD_NAME: &'static str = "ingredients";
	const TABLE: &'static str = "ingredients";
	const JOIN_TABLE: &'static str = "recipe_ingredients";
	const JOIN_COLUMN: &'static str = "ingredient_id";

	fn label_id(&self) -> i64 {
		self.id
	}

	fn label_name(&self) -> &str {
		&self.name
	}
}

fn placeholders(count: usize) -> String {
	vec!["?"; count].join(", ")
}

async fn fetch_all<T: DeserializeOwned>(
	tx: &mut dyn TransactionExecutor,
	sql: &str,
	params: Vec<QueryValue>,
) -> Result<Vec<T>> {
	let rows = tx.fetch_all(sql, params).await?;
	rows.into_iter()
		.map(|row| db::from_row(QueryRow::from_backend_row(row)))
		.collect()
}

/// Owner's labels ordered by name, descending
///
/// With `assigned_only`, labels not attached to any recipe are left out.
pub async fn list_labels<L: Label>(
	conn: &DatabaseConnection,
	owner: i64,
	assigned_only: bool,
) -> Result<Vec<L>> {
	let mut sql = format!(
		"SELECT id, user_id, name FROM {table} WHERE user_id = ?",
		table = L::TABLE
	);
	if assigned_only {
		sql.push_str(&format!(
			" AND EXISTS (SELECT 1 FROM {join} WHERE {join}.{column} = {table}.id)",
			join = L::JOIN_TABLE,
			column = L::JOIN_COLUMN,
			table = L::TABLE
		));
	}
	sql.push_str(" ORDER BY name DESC, id DESC");

	db::from_rows(conn.query(&sql, vec![QueryValue::from(owner)]).await?)
}

pub async fn get_label<L: Label>(
	conn: &DatabaseConnection,
	owner: i64,
	id: i64,
) -> Result<Option<L>> {
	let sql = format!(
		"SELECT id, user_id, name FROM {} WHERE id = ? AND user_id = ?",
		L::TABLE
	);
	db::first(
		conn.query(&sql, vec![QueryValue::from(id), QueryValue::from(owner)])
			.await?,
	)
}

/// Renames one of the owner's labels; `None` when it is not theirs
pub async fn rename_label<L: Label>(
	conn: &DatabaseConnection,
	owner: i64,
	id: i64,
	name: &str,
) -> Result<Option<L>> {
	let sql = format!(
		"UPDATE {} SET name = ? WHERE id = ? AND user_id = ? RETURNING id, user_id, name",
		L::TABLE
	);
	let rows = conn
		.query(
			&sql,
			vec![
				QueryValue::from(name),
				QueryValue::from(id),
				QueryValue::from(owner),
			],
		)
		.await
		.map_err(|e| match Error::from(e) {
			err if err.is_unique_violation() => Error::field(
				"name",
				format!("{} with this name already exists.", L::VERBOSE_NAME),
			),
			other => other,
		})?;
	db::first(rows)
}

/// Deletes one of the owner's labels, detaching it from every recipe
pub async fn delete_label<L: Label>(conn: &DatabaseConnection, owner: i64, id: i64) -> Result<bool> {
	let sql = format!("DELETE FROM {} WHERE id = ? AND user_id = ?", L::TABLE);
	let deleted = conn
		.execute(&sql, vec![QueryValue::from(id), QueryValue::from(owner)])
		.await?;
	Ok(deleted > 0)
}

/// Labels attached to a recipe, by id
pub async fn labels_for_recipe<L: Label>(
	conn: &DatabaseConnection,
	recipe_id: i64,
) -> Result<Vec<L>> {
	let sql = format!(
		"SELECT l.id, l.user_id, l.name FROM {table} l \
		 JOIN {join} j ON j.{column} = l.id \
		 WHERE j.recipe_id = ? ORDER BY l.id",
		table = L::TABLE,
		join = L::JOIN_TABLE,
		column = L::JOIN_COLUMN
	);
	db::from_rows(conn.query(&sql, vec![QueryValue::from(recipe_id)]).await?)
}

#[derive(Deserialize)]
struct Attachment {
	recipe_id: i64,
	label_id: i64,
}

/// Attached label ids for several recipes at once
pub async fn label_ids_for_recipes<L: Label>(
	conn: &DatabaseConnection,
	recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<i64>>> {
	let mut ids: HashMap<i64, Vec<i64>> = HashMap::new();
	if recipe_ids.is_empty() {
		return Ok(ids);
	}

	let sql = format!(
		"SELECT recipe_id, {column} AS label_id FROM {join} WHERE recipe_id IN ({marks}) \
		 ORDER BY {column}",
		column = L::JOIN_COLUMN,
		join = L::JOIN_TABLE,
		marks = placeholders(recipe_ids.len())
	);
	let params = recipe_ids.iter().copied().map(QueryValue::from).collect();
	let rows: Vec<Attachment> = db::from_rows(conn.query(&sql, params).await?)?;
	for row in rows {
		ids.entry(row.recipe_id).or_default().push(row.label_id);
	}
	Ok(ids)
}

/// One of the owner's labels inside a transaction
pub async fn find_label<L: Label>(
	tx: &mut dyn TransactionExecutor,
	owner: i64,
	id: i64,
) -> Result<Option<L>> {
	let sql = format!(
		"SELECT id, user_id, name FROM {} WHERE id = ? AND user_id = ?",
		L::TABLE
	);
	let labels = fetch_all(tx, &sql, vec![QueryValue::from(id), QueryValue::from(owner)]).await?;
	Ok(labels.into_iter().next())
}

/// Returns the owner's label called `name`, creating it if needed
///
/// The insert is a no-op when the `(user_id, name)` pair exists, so two
/// concurrent requests resolve to the same row.
pub async fn get_or_create_label<L: Label>(
	tx: &mut dyn TransactionExecutor,
	owner: i64,
	name: &str,
) -> Result<L> {
	let insert = format!(
		"INSERT INTO {} (user_id, name) VALUES (?, ?) ON CONFLICT (user_id, name) DO NOTHING",
		L::TABLE
	);
	tx.execute(&insert, vec![QueryValue::from(owner), QueryValue::from(name)])
		.await?;

	let select = format!(
		"SELECT id, user_id, name FROM {} WHERE user_id = ? AND name = ?",
		L::TABLE
	);
	fetch_all(tx, &select, vec![QueryValue::from(owner), QueryValue::from(name)])
		.await?
		.into_iter()
		.next()
		.ok_or_else(|| Error::Database(format!("{} {:?} vanished after insert", L::VERBOSE_NAME, name)))
}

/// Replaces the set of labels attached to a recipe
pub async fn set_recipe_labels<L: Label>(
	tx: &mut dyn TransactionExecutor,
	recipe_id: i64,
	label_ids: &[i64],
) -> Result<()> {
	let clear = format!("DELETE FROM {} WHERE recipe_id = ?", L::JOIN_TABLE);
	tx.execute(&clear, vec![QueryValue::from(recipe_id)]).await?;

	let insert = format!(
		"INSERT OR IGNORE INTO {} (recipe_id, {}) VALUES (?, ?)",
		L::JOIN_TABLE,
		L::JOIN_COLUMN
	);
	for label_id in label_ids {
		tx.execute(
			&insert,
			vec![QueryValue::from(recipe_id), QueryValue::from(*label_id)],
		)
		.await?;
	}
	Ok(())
}

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, description, link, image";

#[model(app_label = "recipes", table_name = "recipes")]
#[derive(Serialize, Deserialize)]
pub struct Recipe {
	#[field(primary_key = true)]
	id: i64,

	user_id: i64,

	#[field(max_length = 255)]
	title: String,

	time_minutes: i32,

	/// Decimal rendered with two places, e.g. `5.50`
	#[field(max_length = 10)]
	price: String,

	#[field(max_length = 65535)]
	description: String,

	#[field(max_length = 255)]
	link: String,

	/// Storage key of the uploaded image
	#[field(max_length = 255, null = true)]
	image: Option<String>,
}

/// Scalar fields written on create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
	pub title: String,
	pub time_minutes: i32,
	pub price: String,
	pub description: String,
	pub link: String,
}

/// Recipes having any of `tags` and any of `ingredients`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
	pub tags: Option<Vec<i64>>,
	pub ingredients: Option<Vec<i64>>,
}

impl RecipeFilter {
	fn push_clause<L: Label>(ids: &Option<Vec<i64>>, sql: &mut String, params: &mut Vec<QueryValue>) {
		let Some(ids) = ids else { return };
		sql.push_str(&format!(
			" AND EXISTS (SELECT 1 FROM {join} WHERE {join}.recipe_id = recipes.id \
			 AND {join}.{column} IN ({marks}))",
			join = L::JOIN_TABLE,
			column = L::JOIN_COLUMN,
			marks = placeholders(ids.len())
		));
		params.extend(ids.iter().copied().map(QueryValue::from));
	}
}

impl Recipe {
	/// Owner's recipes, newest first
	pub async fn list(
		conn: &DatabaseConnection,
		owner: i64,
		filter: &RecipeFilter,
	) -> Result<Vec<Recipe>> {
		let mut sql = format!("SELECT {} FROM recipes WHERE user_id = ?", RECIPE_COLUMNS);
		let mut params = vec![QueryValue::from(owner)];
		RecipeFilter::push_clause::<Tag>(&filter.tags, &mut sql, &mut params);
		RecipeFilter::push_clause::<Ingredient>(&filter.ingredients, &mut sql, &mut params);
		sql.push_str(" ORDER BY id DESC");

		db::from_rows(conn.query(&sql, params).await?)
	}

	pub async fn get(conn: &DatabaseConnection, owner: i64, id: i64) -> Result<Option<Recipe>> {
		let sql = format!(
			"SELECT {} FROM recipes WHERE id = ? AND user_id = ?",
			RECIPE_COLUMNS
		);
		db::first(
			conn.query(&sql, vec![QueryValue::from(id), QueryValue::from(owner)])
				.await?,
		)
	}

	/// Same as [`Recipe::get`] inside a transaction
	pub async fn find(
		tx: &mut dyn TransactionExecutor,
		owner: i64,
		id: i64,
	) -> Result<Option<Recipe>> {
		let sql = format!(
			"SELECT {} FROM recipes WHERE id = ? AND user_id = ?",
			RECIPE_COLUMNS
		);
		let recipes = fetch_all(tx, &sql, vec![QueryValue::from(id), QueryValue::from(owner)]).await?;
		Ok(recipes.into_iter().next())
	}

	pub async fn create(
		tx: &mut dyn TransactionExecutor,
		owner: i64,
		fields: &NewRecipe,
	) -> Result<Recipe> {
		let sql = format!(
			"INSERT INTO recipes (user_id, title, time_minutes, price, description, link) \
			 VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
			RECIPE_COLUMNS
		);
		fetch_all(
			tx,
			&sql,
			vec![
				QueryValue::from(owner),
				QueryValue::from(fields.title.as_str()),
				QueryValue::from(fields.time_minutes),
				QueryValue::from(fields.price.as_str()),
				QueryValue::from(fields.description.as_str()),
				QueryValue::from(fields.link.as_str()),
			],
		)
		.await?
		.into_iter()
		.next()
		.ok_or_else(|| Error::Database("INSERT returned no recipe".to_string()))
	}

	/// Writes the scalar fields back; the owner column is never touched
	pub async fn save(&self, tx: &mut dyn TransactionExecutor) -> Result<()> {
		tx.execute(
			"UPDATE recipes SET title = ?, time_minutes = ?, price = ?, description = ?, link = ? \
			 WHERE id = ? AND user_id = ?",
			vec![
				QueryValue::from(self.title.as_str()),
				QueryValue::from(self.time_minutes),
				QueryValue::from(self.price.as_str()),
				QueryValue::from(self.description.as_str()),
				QueryValue::from(self.link.as_str()),
				QueryValue::from(self.id),
				QueryValue::from(self.user_id),
			],
		)
		.await?;
		Ok(())
	}

	/// Records a new image key
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when the recipe was deleted in the meantime; the
	/// in-memory key is left unchanged in that case.
	pub async fn store_image(&mut self, conn: &DatabaseConnection, image: Option<String>) -> Result<()> {
		let updated = conn
			.execute(
				"UPDATE recipes SET image = ? WHERE id = ? AND user_id = ?",
				vec![
					db::nullable(image.as_deref()),
					QueryValue::from(self.id),
					QueryValue::from(self.user_id),
				],
			)
			.await?;
		if updated == 0 {
			return Err(Error::NotFound("Recipe"));
		}
		self.image = image;
		Ok(())
	}

	/// Deletes one of the owner's recipes and returns it
	pub async fn delete(conn: &DatabaseConnection, owner: i64, id: i64) -> Result<Option<Recipe>> {
		let sql = format!(
			"DELETE FROM recipes WHERE id = ? AND user_id = ? RETURNING {}",
			RECIPE_COLUMNS
		);
		db::first(
			conn.query(&sql, vec![QueryValue::from(id), QueryValue::from(owner)])
				.await?,
		)
	}
}
