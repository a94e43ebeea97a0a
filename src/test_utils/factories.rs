//! Record factories

use reinhardt::db::DatabaseConnection;

use crate::apps::recipes::models::{self, Ingredient, Label, NewRecipe, Recipe, Tag};
use crate::apps::users::models::User;

pub const DEFAULT_PASSWORD: &str = "testpass123";

pub async fn create_user(conn: &DatabaseConnection, email: &str) -> User {
	User::create_user(conn, email, DEFAULT_PASSWORD, "Test Name")
		.await
		.expect("user should be created")
}

/// Builder for recipes with sample defaults
#[derive(Debug, Clone)]
pub struct RecipeFactory {
	fields: NewRecipe,
}

impl Default for RecipeFactory {
	fn default() -> Self {
		Self {
			fields: NewRecipe {
				title: "Sample recipe title".to_string(),
				time_minutes: 22,
				price: "5.25".to_string(),
				description: "Sample description".to_string(),
				link: "https://example.com/recipe.pdf".to_string(),
			},
		}
	}
}

impl RecipeFactory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn title(mut self, title: &str) -> Self {
		self.fields.title = title.to_string();
		self
	}

	pub fn link(mut self, link: &str) -> Self {
		self.fields.link = link.to_string();
		self
	}

	pub async fn create(self, conn: &DatabaseConnection, owner: &User) -> Recipe {
		let mut tx = conn.begin().await.expect("transaction should start");
		let recipe = Recipe::create(tx.as_mut(), owner.id(), &self.fields)
			.await
			.expect("recipe should be created");
		tx.commit().await.expect("transaction should commit");
		recipe
	}
}

pub async fn create_recipe(conn: &DatabaseConnection, owner: &User) -> Recipe {
	RecipeFactory::new().create(conn, owner).await
}

pub async fn create_label<L: Label>(conn: &DatabaseConnection, owner: &User, name: &str) -> L {
	let mut tx = conn.begin().await.expect("transaction should start");
	let label = models::get_or_create_label::<L>(tx.as_mut(), owner.id(), name)
		.await
		.expect("label should be created");
	tx.commit().await.expect("transaction should commit");
	label
}

pub async fn create_tag(conn: &DatabaseConnection, owner: &User, name: &str) -> Tag {
	create_label(conn, owner, name).await
}

pub async fn create_ingredient(conn: &DatabaseConnection, owner: &User, name: &str) -> Ingredient {
	create_label(conn, owner, name).await
}

/// Attaches labels to a recipe, replacing existing ones of the same kind
pub async fn attach<L: Label>(conn: &DatabaseConnection, recipe: &Recipe, labels: &[&L]) {
	let ids: Vec<i64> = labels.iter().map(|label| label.label_id()).collect();
	let mut tx = conn.begin().await.expect("transaction should start");
	models::set_recipe_labels::<L>(tx.as_mut(), recipe.id(), &ids)
		.await
		.expect("labels should attach");
	tx.commit().await.expect("transaction should commit");
}
