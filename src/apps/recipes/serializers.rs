//! Recipe, tag and ingredient serializers
//!
//! Write payloads are validated field by field from the raw JSON object so
//! that every offending field is reported at once. `partial` mirrors
//! `PATCH`: absent fields are left alone. Without it (`POST`, `PUT`) absent
//! optional fields fall back to their defaults and absent tag or ingredient
//! lists clear the associations.
//!
//! Read-only keys (`id`, `user`, `image`) are accepted and ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::apps::recipes::models::{Ingredient, Label, NewRecipe, Recipe, Tag};
use crate::core::exception::{Result, ValidationErrors};

pub const MAX_LENGTH: usize = 255;
const PRICE_MAX_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";

/// Reference to a tag or ingredient inside a recipe payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelRef {
	/// An existing record of the caller
	Id(i64),
	/// Looked up by name among the caller's records, created if missing
	Named(String),
}

/// Validated recipe write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeInput {
	pub title: Option<String>,
	pub time_minutes: Option<i32>,
	pub price: Option<Decimal>,
	pub description: Option<String>,
	pub link: Option<String>,
	pub tags: Option<Vec<LabelRef>>,
	pub ingredients: Option<Vec<LabelRef>>,
}

impl RecipeInput {
	/// Validates a JSON object
	///
	/// # Examples
	///
	/// ```
	/// use recipe_app::apps::recipes::serializers::{LabelRef, RecipeInput};
	/// use serde_json::json;
	///
	/// let payload = json!({"title": "Soup", "time_minutes": 5, "price": "5.5", "tags": [{"name": "Thai"}, 3]});
	/// let input = RecipeInput::validate(payload.as_object().unwrap(), false).unwrap();
	///
	/// assert_eq!(input.price.unwrap().to_string(), "5.50");
	/// assert_eq!(input.description.as_deref(), Some(""));
	/// assert_eq!(
	///     input.tags.unwrap(),
	///     vec![LabelRef::Named("Thai".into()), LabelRef::Id(3)]
	/// );
	/// assert_eq!(input.ingredients, Some(vec![]));
	/// ```
	pub fn validate(data: &Map<String, Value>, partial: bool) -> Result<Self> {
		let mut errors = ValidationErrors::new();
		let mut input = RecipeInput::default();

		let field = |name: &str, errors: &mut ValidationErrors| -> Option<Value> {
			match data.get(name) {
				None => {
					if !partial {
						errors.add(name, REQUIRED);
					}
					None
				}
				Some(Value::Null) => {
					errors.add(name, NOT_NULL);
					None
				}
				Some(value) => Some(value.clone()),
			}
		};

		if let Some(value) = field("title", &mut errors) {
			input.title = collect(&mut errors, "title", validate_text(&value, true));
		}
		if let Some(value) = field("time_minutes", &mut errors) {
			input.time_minutes = collect(&mut errors, "time_minutes", validate_time(&value));
		}
		if let Some(value) = field("price", &mut errors) {
			input.price = collect(&mut errors, "price", validate_price(&value));
		}

		for (name, slot) in [
			("description", &mut input.description),
			("link", &mut input.link),
		] {
			match data.get(name) {
				None if !partial => *slot = Some(String::new()),
				None => {}
				Some(Value::Null) => errors.add(name, NOT_NULL),
				Some(value) => {
					let max = (name == "link").then_some(MAX_LENGTH);
					*slot = collect(&mut errors, name, validate_optional_text(value, max));
				}
			}
		}

		for (name, slot) in [
			(Tag::FIELD_NAME, &mut input.tags),
			(Ingredient::FIELD_NAME, &mut input.ingredients),
		] {
			*slot = match data.get(name) {
				None if !partial => Some(Vec::new()),
				None => None,
				Some(Value::Null) => {
					errors.add(name, NOT_NULL);
					None
				}
				Some(value) => collect(&mut errors, name, validate_label_refs(value)),
			};
		}

		errors.into_result()?;
		Ok(input)
	}

	/// Fields for a new recipe; only valid after a non-partial validation
	pub fn into_new_recipe(self) -> Option<(NewRecipe, Vec<LabelRef>, Vec<LabelRef>)> {
		let fields = NewRecipe {
			title: self.title?,
			time_minutes: self.time_minutes?,
			price: self.price?.to_string(),
			description: self.description.unwrap_or_default(),
			link: self.link.unwrap_or_default(),
		};
		Some((
			fields,
			self.tags.unwrap_or_default(),
			self.ingredients.unwrap_or_default(),
		))
	}

	/// Copies every supplied scalar field onto `recipe`
	pub fn apply_to(&self, recipe: &mut Recipe) {
		if let Some(title) = &self.title {
			recipe.set_title(title.clone());
		}
		if let Some(time_minutes) = self.time_minutes {
			recipe.set_time_minutes(time_minutes);
		}
		if let Some(price) = self.price {
			recipe.set_price(price.to_string());
		}
		if let Some(description) = &self.description {
			recipe.set_description(description.clone());
		}
		if let Some(link) = &self.link {
			recipe.set_link(link.clone());
		}
	}
}

fn collect<T>(
	errors: &mut ValidationErrors,
	field: &str,
	result: std::result::Result<T, String>,
) -> Option<T> {
	match result {
		Ok(value) => Some(value),
		Err(message) => {
			errors.add(field, message);
			None
		}
	}
}

fn validate_text(value: &Value, required: bool) -> std::result::Result<String, String> {
	let Value::String(text) = value else {
		return Err("Not a valid string.".to_string());
	};
	let text = text.trim();
	if required && text.is_empty() {
		return Err(NOT_BLANK.to_string());
	}
	if text.chars().count() > MAX_LENGTH {
		return Err(format!(
			"Ensure this field has no more than {} characters.",
			MAX_LENGTH
		));
	}
	Ok(text.to_string())
}

fn validate_optional_text(value: &Value, max: Option<usize>) -> std::result::Result<String, String> {
	let Value::String(text) = value else {
		return Err("Not a valid string.".to_string());
	};
	if let Some(max) = max
		&& text.chars().count() > max
	{
		return Err(format!("Ensure this field has no more than {} characters.", max));
	}
	Ok(text.clone())
}

fn validate_time(value: &Value) -> std::result::Result<i32, String> {
	let invalid = || "A valid integer is required.".to_string();
	let number = match value {
		Value::Number(number) => number
			.as_i64()
			.or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
			.ok_or_else(invalid)?,
		Value::String(text) => text.trim().parse::<i64>().map_err(|_| invalid())?,
		_ => return Err(invalid()),
	};
	if number < 0 {
		return Err("Ensure this value is greater than or equal to 0.".to_string());
	}
	i32::try_from(number)
		.map_err(|_| format!("Ensure this value is less than or equal to {}.", i32::MAX))
}

/// Parses a price given as a string or a JSON number
///
/// At most 5 digits in total and 2 decimal places as written, so `1.230` is
/// rejected like `1.234`; the result is rescaled to two places so `5.5` is
/// stored and rendered as `5.50`.
pub fn validate_price(value: &Value) -> std::result::Result<Decimal, String> {
	let invalid = || "A valid number is required.".to_string();
	let raw = match value {
		Value::Number(number) => number.to_string(),
		Value::String(text) => text.trim().to_string(),
		_ => return Err(invalid()),
	};
	let mut price: Decimal = raw.parse().map_err(|_| invalid())?;

	if price.is_sign_negative() && !price.is_zero() {
		return Err("Ensure this value is greater than or equal to 0.".to_string());
	}
	if price.scale() > PRICE_DECIMAL_PLACES {
		return Err(format!(
			"Ensure that there are no more than {} decimal places.",
			PRICE_DECIMAL_PLACES
		));
	}
	let whole_digits = price.trunc().abs().to_string().trim_start_matches('0').len() as u32;
	if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
		return Err(format!(
			"Ensure that there are no more than {} digits before the decimal point.",
			PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
		));
	}

	price = price.abs();
	price.rescale(PRICE_DECIMAL_PLACES);
	Ok(price)
}

fn validate_label_refs(value: &Value) -> std::result::Result<Vec<LabelRef>, String> {
	let Value::Array(items) = value else {
		return Err("Expected a list of items.".to_string());
	};

	let mut refs = Vec::with_capacity(items.len());
	for item in items {
		let label = match item {
			Value::Number(number) => number
				.as_i64()
				.map(LabelRef::Id)
				.ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", number))?,
			Value::Object(object) => match object.get("name") {
				Some(Value::String(name)) => LabelRef::Named(validate_label_name(name)?),
				Some(_) => return Err("name: Not a valid string.".to_string()),
				None => return Err(format!("name: {}", REQUIRED)),
			},
			other => {
				return Err(format!(
					"Incorrect type. Expected pk value or object, received {}.",
					json_type(other)
				));
			}
		};
		if !refs.contains(&label) {
			refs.push(label);
		}
	}
	Ok(refs)
}

fn validate_label_name(name: &str) -> std::result::Result<String, String> {
	let name = name.trim();
	if name.is_empty() {
		return Err(format!("name: {}", NOT_BLANK));
	}
	if name.chars().count() > MAX_LENGTH {
		return Err(format!(
			"name: Ensure this field has no more than {} characters.",
			MAX_LENGTH
		));
	}
	Ok(name.to_string())
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "str",
		Value::Array(_) => "list",
		Value::Object(_) => "dict",
	}
}

/// `PUT`/`PATCH` body for a tag or ingredient
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LabelUpdateRequest {
	#[validate(length(
		min = 1,
		max = 255,
		message = "Ensure this field is not blank and has no more than 255 characters."
	))]
	pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelResponse {
	pub id: i64,
	pub name: String,
}

impl LabelResponse {
	pub fn new<L: Label>(label: &L) -> Self {
		Self {
			id: label.label_id(),
			name: label.label_name().to_string(),
		}
	}
}

/// List representation: scalar fields and label ids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeSummary {
	pub id: i64,
	pub title: String,
	pub time_minutes: i32,
	pub price: String,
	pub tags: Vec<i64>,
	pub ingredients: Vec<i64>,
}

impl RecipeSummary {
	pub fn new(recipe: &Recipe, tags: Vec<i64>, ingredients: Vec<i64>) -> Self {
		Self {
			id: recipe.id(),
			title: recipe.title().clone(),
			time_minutes: recipe.time_minutes(),
			price: recipe.price().clone(),
			tags,
			ingredients,
		}
	}
}

/// Detail representation with nested labels and the image URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeDetail {
	pub id: i64,
	pub title: String,
	pub time_minutes: i32,
	pub price: String,
	pub description: String,
	pub link: String,
	pub image: Option<String>,
	pub tags: Vec<LabelResponse>,
	pub ingredients: Vec<LabelResponse>,
}

impl RecipeDetail {
	pub fn new(
		recipe: &Recipe,
		image_url: Option<String>,
		tags: &[Tag],
		ingredients: &[Ingredient],
	) -> Self {
		Self {
			id: recipe.id(),
			title: recipe.title().clone(),
			time_minutes: recipe.time_minutes(),
			price: recipe.price().clone(),
			description: recipe.description().clone(),
			link: recipe.link().clone(),
			image: image_url,
			tags: tags.iter().map(LabelResponse::new).collect(),
			ingredients: ingredients.iter().map(LabelResponse::new).collect(),
		}
	}
}

/// Response of the image upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeImageResponse {
	pub id: i64,
	pub image: Option<String>,
}
