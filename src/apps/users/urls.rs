//! URL configuration for the users app

use reinhardt::Method;
use reinhardt::urls::routers::ServerRouter;

use crate::apps::users::views;
use crate::config::state::AppState;
use crate::core::routing::endpoint;

/// Routes anonymous callers may reach, relative to the mount point
pub const PUBLIC_ROUTES: &[&str] = &["/create/", "/token/"];

pub fn url_patterns(state: &AppState) -> ServerRouter {
	ServerRouter::new()
		.with_namespace("user")
		.function("/create/", Method::POST, endpoint(state, views::create_user))
		.function("/token/", Method::POST, endpoint(state, views::create_token))
		.function("/me/", Method::GET, endpoint(state, views::retrieve_me))
		.function("/me/", Method::PUT, endpoint(state, views::update_me))
		.function("/me/", Method::PATCH, endpoint(state, views::partial_update_me))
}
