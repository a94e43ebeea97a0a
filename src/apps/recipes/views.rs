//! Recipe API views
//!
//! Every lookup goes through the caller's id, so a recipe, tag or
//! ingredient belonging to another user answers 404 exactly like a missing
//! one. Writes run in a single transaction; stored image files are cleaned
//! up after the database has been updated.
//!
//! Recipe writes accept JSON, url-encoded and multipart bodies.

use std::collections::HashMap;

use reinhardt::db::orm::TransactionExecutor;
use reinhardt::{Request, Response};
use serde_json::Value;
use validator::Validate;

use crate::apps::recipes::images::{upload_key, validate_image};
use crate::apps::recipes::models::{self, Ingredient, Label, Recipe, RecipeFilter, Tag};
use crate::apps::recipes::serializers::{
	LabelRef, LabelResponse, LabelUpdateRequest, RecipeDetail, RecipeImageResponse, RecipeInput,
	RecipeSummary,
};
use crate::config::state::AppState;
use crate::core::exception::{Error, Result, ValidationErrors};
use crate::core::request::RequestExt;

const RECIPE: &str = "Recipe";

/// Keys that repeat in form bodies
const LIST_FIELDS: &[&str] = &[Tag::FIELD_NAME, Ingredient::FIELD_NAME];

/// Comma separated ids from a query parameter; `None` when absent or empty
fn parse_id_list(request: &Request, name: &str) -> Result<Option<Vec<i64>>> {
	let Some(raw) = request.query_param(name) else {
		return Ok(None);
	};

	let mut ids = Vec::new();
	for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
		let id = part
			.parse::<i64>()
			.map_err(|_| Error::field(name, format!("\"{}\" is not a valid id.", part)))?;
		ids.push(id);
	}
	Ok((!ids.is_empty()).then_some(ids))
}

fn image_url(state: &AppState, recipe: &Recipe) -> Option<String> {
	recipe.image().as_deref().map(|key| state.storage.url(key))
}

async fn recipe_detail(state: &AppState, recipe: &Recipe) -> Result<RecipeDetail> {
	let tags = models::labels_for_recipe::<Tag>(&state.db, recipe.id()).await?;
	let ingredients = models::labels_for_recipe::<Ingredient>(&state.db, recipe.id()).await?;
	Ok(RecipeDetail::new(
		recipe,
		image_url(state, recipe),
		&tags,
		&ingredients,
	))
}

/// Resolves references to label ids, creating named labels that are missing
///
/// Unknown or foreign ids are recorded in `errors` under the field name.
async fn resolve_labels<L: Label>(
	tx: &mut dyn TransactionExecutor,
	owner: i64,
	refs: &[LabelRef],
	errors: &mut ValidationErrors,
) -> Result<Vec<i64>> {
	let mut ids = Vec::with_capacity(refs.len());
	for label_ref in refs {
		let id = match label_ref {
			LabelRef::Id(id) => match models::find_label::<L>(&mut *tx, owner, *id).await? {
				Some(label) => label.label_id(),
				None => {
					errors.add(
						L::FIELD_NAME,
						format!("Invalid pk \"{}\" - object does not exist.", id),
					);
					continue;
				}
			},
			LabelRef::Named(name) => models::get_or_create_label::<L>(&mut *tx, owner, name)
				.await?
				.label_id(),
		};
		if !ids.contains(&id) {
			ids.push(id);
		}
	}
	Ok(ids)
}

/// Replaces the associations that were supplied; `None` lists are untouched
async fn write_labels(
	tx: &mut dyn TransactionExecutor,
	owner: i64,
	recipe_id: i64,
	tags: Option<&[LabelRef]>,
	ingredients: Option<&[LabelRef]>,
) -> Result<()> {
	let mut errors = ValidationErrors::new();
	let tag_ids = match tags {
		Some(refs) => Some(resolve_labels::<Tag>(&mut *tx, owner, refs, &mut errors).await?),
		None => None,
	};
	let ingredient_ids = match ingredients {
		Some(refs) => Some(resolve_labels::<Ingredient>(&mut *tx, owner, refs, &mut errors).await?),
		None => None,
	};
	errors.into_result()?;

	if let Some(ids) = tag_ids {
		models::set_recipe_labels::<Tag>(&mut *tx, recipe_id, &ids).await?;
	}
	if let Some(ids) = ingredient_ids {
		models::set_recipe_labels::<Ingredient>(&mut *tx, recipe_id, &ids).await?;
	}
	Ok(())
}

/// Removes a stored file; failures are only logged
async fn discard_image(state: &AppState, key: &str) {
	if let Err(e) = state.storage.delete(key).await {
		tracing::warn!(key, error = %e, "failed to remove stored image");
	}
}

/// `GET /api/recipe/recipes/`
pub async fn list_recipes(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let filter = RecipeFilter {
		tags: parse_id_list(&request, Tag::FIELD_NAME)?,
		ingredients: parse_id_list(&request, Ingredient::FIELD_NAME)?,
	};

	let recipes = Recipe::list(&state.db, owner, &filter).await?;
	let recipe_ids: Vec<i64> = recipes.iter().map(Recipe::id).collect();
	let mut tags = models::label_ids_for_recipes::<Tag>(&state.db, &recipe_ids).await?;
	let mut ingredients =
		models::label_ids_for_recipes::<Ingredient>(&state.db, &recipe_ids).await?;

	let take = |map: &mut HashMap<i64, Vec<i64>>, id: i64| map.remove(&id).unwrap_or_default();
	let summaries: Vec<RecipeSummary> = recipes
		.iter()
		.map(|recipe| {
			RecipeSummary::new(
				recipe,
				take(&mut tags, recipe.id()),
				take(&mut ingredients, recipe.id()),
			)
		})
		.collect();

	Ok(Response::ok().with_json(&summaries)?)
}

/// `POST /api/recipe/recipes/`
pub async fn create_recipe(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let data = request.parse_data().await?.into_object(LIST_FIELDS)?;
	let (fields, tags, ingredients) = RecipeInput::validate(&data, false)?
		.into_new_recipe()
		.ok_or_else(|| Error::Internal("validated recipe is missing required fields".into()))?;

	let mut tx = state.db.begin().await?;
	let recipe = Recipe::create(tx.as_mut(), owner, &fields).await?;
	write_labels(
		tx.as_mut(),
		owner,
		recipe.id(),
		Some(&tags),
		Some(&ingredients),
	)
	.await?;
	tx.commit().await?;

	tracing::info!(recipe_id = recipe.id(), user_id = owner, "recipe created");
	let detail = recipe_detail(&state, &recipe).await?;
	Ok(Response::created().with_json(&detail)?)
}

/// `GET /api/recipe/recipes/{id}/`
pub async fn retrieve_recipe(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;

	let recipe = Recipe::get(&state.db, owner, id)
		.await?
		.ok_or(Error::NotFound(RECIPE))?;
	let detail = recipe_detail(&state, &recipe).await?;

	Ok(Response::ok().with_json(&detail)?)
}

/// `PUT /api/recipe/recipes/{id}/`
pub async fn update_recipe(state: AppState, request: Request) -> Result<Response> {
	save_recipe(state, request, false).await
}

/// `PATCH /api/recipe/recipes/{id}/`
pub async fn partial_update_recipe(state: AppState, request: Request) -> Result<Response> {
	save_recipe(state, request, true).await
}

async fn save_recipe(state: AppState, request: Request, partial: bool) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;

	let mut tx = state.db.begin().await?;
	let mut recipe = Recipe::find(tx.as_mut(), owner, id)
		.await?
		.ok_or(Error::NotFound(RECIPE))?;

	let data = request.parse_data().await?.into_object(LIST_FIELDS)?;
	let input = RecipeInput::validate(&data, partial)?;

	input.apply_to(&mut recipe);
	recipe.save(tx.as_mut()).await?;
	write_labels(
		tx.as_mut(),
		owner,
		recipe.id(),
		input.tags.as_deref(),
		input.ingredients.as_deref(),
	)
	.await?;
	tx.commit().await?;

	let detail = recipe_detail(&state, &recipe).await?;
	Ok(Response::ok().with_json(&detail)?)
}

/// `DELETE /api/recipe/recipes/{id}/`
pub async fn destroy_recipe(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;

	let recipe = Recipe::delete(&state.db, owner, id)
		.await?
		.ok_or(Error::NotFound(RECIPE))?;
	if let Some(key) = recipe.image() {
		discard_image(&state, key).await;
	}

	tracing::info!(recipe_id = id, user_id = owner, "recipe deleted");
	Ok(Response::no_content())
}

/// `POST /api/recipe/recipes/{id}/upload-image/`
///
/// Expects the file in the `image` part of a multipart body. A previous
/// image is removed once the new one is recorded.
pub async fn upload_image(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;

	let mut recipe = Recipe::get(&state.db, owner, id)
		.await?
		.ok_or(Error::NotFound(RECIPE))?;

	let data = request.parse_data().await?;
	let file = match data.file("image") {
		Some(file) => file,
		None if data.has_value("image") => {
			return Err(Error::field(
				"image",
				"The submitted data was not a file. Check the encoding type on the form.",
			));
		}
		None => return Err(Error::field("image", "No file was submitted.")),
	};
	let format = validate_image(&file.data)?;

	let key = upload_key(format);
	state.storage.save(&key, &file.data).await?;

	let previous = recipe.image().clone();
	if let Err(e) = recipe.store_image(&state.db, Some(key.clone())).await {
		discard_image(&state, &key).await;
		return Err(e);
	}
	if let Some(previous) = previous {
		discard_image(&state, &previous).await;
	}

	tracing::info!(recipe_id = id, key = %key, "recipe image stored");
	Ok(Response::ok().with_json(&RecipeImageResponse {
		id: recipe.id(),
		image: image_url(&state, &recipe),
	})?)
}

fn parse_assigned_only(request: &Request) -> Result<bool> {
	match request.query_param("assigned_only").as_deref().map(str::trim) {
		None | Some("") | Some("0") | Some("false") => Ok(false),
		Some("1") | Some("true") => Ok(true),
		Some(_) => Err(Error::field("assigned_only", "Must be 0 or 1.")),
	}
}

/// `GET /api/recipe/tags/` and `GET /api/recipe/ingredients/`
pub async fn list_labels<L: Label>(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let assigned_only = parse_assigned_only(&request)?;

	let labels = models::list_labels::<L>(&state.db, owner, assigned_only).await?;
	let body: Vec<LabelResponse> = labels.iter().map(LabelResponse::new).collect();
	Ok(Response::ok().with_json(&body)?)
}

/// `PUT` on a tag or ingredient
pub async fn update_label<L: Label>(state: AppState, request: Request) -> Result<Response> {
	save_label::<L>(state, request, false).await
}

/// `PATCH` on a tag or ingredient
pub async fn partial_update_label<L: Label>(state: AppState, request: Request) -> Result<Response> {
	save_label::<L>(state, request, true).await
}

async fn save_label<L: Label>(state: AppState, request: Request, partial: bool) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;
	let not_found = || Error::NotFound(L::MODEL_NAME);

	let current = models::get_label::<L>(&state.db, owner, id)
		.await?
		.ok_or_else(not_found)?;

	let data = request.parse_data().await?.into_object(&[])?;
	let payload: LabelUpdateRequest = serde_json::from_value(Value::Object(data))?;
	payload.validate()?;
	let name = match payload.name.as_deref().map(str::trim) {
		Some("") => return Err(Error::field("name", "This field may not be blank.")),
		Some(name) => name.to_string(),
		None if partial => return Ok(Response::ok().with_json(&LabelResponse::new(&current))?),
		None => return Err(Error::field("name", "This field is required.")),
	};

	let label = models::rename_label::<L>(&state.db, owner, id, &name)
		.await?
		.ok_or_else(not_found)?;
	Ok(Response::ok().with_json(&LabelResponse::new(&label))?)
}

/// `DELETE` on a tag or ingredient
pub async fn destroy_label<L: Label>(state: AppState, request: Request) -> Result<Response> {
	let owner = request.user_id()?;
	let id: i64 = request.path_param("id")?;

	if !models::delete_label::<L>(&state.db, owner, id).await? {
		return Err(Error::NotFound(L::MODEL_NAME));
	}
	Ok(Response::no_content())
}
