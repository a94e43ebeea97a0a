//! Root URL configuration

use std::sync::Arc;

use reinhardt::urls::routers::ServerRouter;
use reinhardt::{Handler, Method, MiddlewareChain};

use crate::apps::users::authentication::AuthenticationMiddleware;
use crate::apps::{recipes, users};
use crate::config::state::AppState;
use crate::config::views;
use crate::core::exception::Result;
use crate::core::middleware::{BodySizeLimitMiddleware, LoggingMiddleware};
use crate::core::routing::{ApiRouter, endpoint};

/// Every route of the project
pub fn url_patterns(state: &AppState) -> ServerRouter {
	ServerRouter::new()
		.mount("/api/user/", users::urls::url_patterns(state))
		.mount("/api/recipe/", recipes::urls::url_patterns(state))
		.function(
			&media_route(&state.settings.media_url),
			Method::GET,
			endpoint(state, views::serve_media),
		)
}

/// Router behind the middleware stack, outermost first
pub fn application(state: AppState) -> Result<Arc<dyn Handler>> {
	let mut router = ApiRouter::new(url_patterns(&state))?
		.allow_any(&media_route(&state.settings.media_url))?;
	for route in users::urls::PUBLIC_ROUTES {
		router = router.allow_any(&format!("/api/user{}", route))?;
	}

	let authentication = AuthenticationMiddleware::new(state.db.clone(), state.tokens.clone());
	Ok(Arc::new(
		MiddlewareChain::new(Arc::new(router))
			.with_middleware(Arc::new(LoggingMiddleware))
			.with_middleware(Arc::new(BodySizeLimitMiddleware::new(
				state.settings.max_upload_size,
			)))
			.with_middleware(Arc::new(authentication)),
	))
}

fn media_route(media_url: &str) -> String {
	format!("/{}/{{*path}}", media_url.trim_matches('/'))
}
