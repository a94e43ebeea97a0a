//! URL configuration for the recipes app

use reinhardt::Method;
use reinhardt::urls::routers::ServerRouter;

use crate::apps::recipes::models::{Ingredient, Label, Tag};
use crate::apps::recipes::views;
use crate::config::state::AppState;
use crate::core::routing::endpoint;

/// List and detail routes of one label model, e.g. `/tags/` and `/tags/{id}/`
fn label_routes<L: Label>(router: ServerRouter, state: &AppState) -> ServerRouter {
	let list = format!("/{}/", L::FIELD_NAME);
	let detail = format!("/{}/{{id}}/", L::FIELD_NAME);

	router
		.function(&list, Method::GET, endpoint(state, views::list_labels::<L>))
		.function(&detail, Method::PUT, endpoint(state, views::update_label::<L>))
		.function(
			&detail,
			Method::PATCH,
			endpoint(state, views::partial_update_label::<L>),
		)
		.function(&detail, Method::DELETE, endpoint(state, views::destroy_label::<L>))
}

pub fn url_patterns(state: &AppState) -> ServerRouter {
	let router = ServerRouter::new()
		.with_namespace("recipe")
		.function("/recipes/", Method::GET, endpoint(state, views::list_recipes))
		.function("/recipes/", Method::POST, endpoint(state, views::create_recipe))
		.function("/recipes/{id}/", Method::GET, endpoint(state, views::retrieve_recipe))
		.function("/recipes/{id}/", Method::PUT, endpoint(state, views::update_recipe))
		.function(
			"/recipes/{id}/",
			Method::PATCH,
			endpoint(state, views::partial_update_recipe),
		)
		.function("/recipes/{id}/", Method::DELETE, endpoint(state, views::destroy_recipe))
		.function(
			"/recipes/{id}/upload-image/",
			Method::POST,
			endpoint(state, views::upload_image),
		);

	let router = label_routes::<Tag>(router, state);
	label_routes::<Ingredient>(router, state)
}
