//! Route dispatch on top of [`ServerRouter`]
//!
//! Views are plain `async fn(state, request) -> Result<Response>` functions.
//! [`endpoint`] binds one to the shared state and renders its error through
//! [`Error::into_response`]; [`ApiRouter`] sits innermost in the middleware
//! chain, rejects anonymous callers on protected routes before method
//! dispatch and renders the router's own 404/405 the same way.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use reinhardt::urls::routers::{PathPattern, ServerRouter};
use reinhardt::{Handler, Method, Request, Response};

use crate::core::exception::{Error, Result};
use crate::core::request::RequestExt;

/// Boxed future returned by routed views
pub type ViewFuture = Pin<Box<dyn Future<Output = reinhardt::Result<Response>> + Send>>;

/// Binds `view` to `state` for registration with [`ServerRouter::function`]
pub fn endpoint<S, V, Fut>(
	state: &S,
	view: V,
) -> impl Fn(Request) -> ViewFuture + Send + Sync + 'static
where
	S: Clone + Send + Sync + 'static,
	V: Fn(S, Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	let state = state.clone();
	move |request| {
		let future = view(state.clone(), request);
		Box::pin(async move { Ok(future.await.unwrap_or_else(Error::into_response)) })
	}
}

struct RouteEntry {
	pattern: PathPattern,
	methods: Vec<Method>,
}

/// Innermost handler of the application
pub struct ApiRouter {
	router: ServerRouter,
	routes: Vec<RouteEntry>,
	public: Vec<PathPattern>,
}

impl ApiRouter {
	pub fn new(router: ServerRouter) -> Result<Self> {
		let mut routes: Vec<RouteEntry> = Vec::new();
		for (path, _, _, methods) in router.get_all_routes() {
			match routes.iter_mut().find(|entry| entry.pattern.pattern() == path) {
				Some(entry) => entry.methods.extend(methods),
				None => routes.push(RouteEntry {
					pattern: compile(&path)?,
					methods,
				}),
			}
		}
		Ok(Self {
			router,
			routes,
			public: Vec::new(),
		})
	}

	/// Lets anonymous callers reach routes matching `path`
	pub fn allow_any(mut self, path: &str) -> Result<Self> {
		self.public.push(compile(path)?);
		Ok(self)
	}

	/// Methods routed for `path`, empty when no route matches
	///
	/// A missing or extra trailing slash still matches, as it does when the
	/// request is dispatched.
	pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
		let toggled = toggle_trailing_slash(path);
		let mut allowed: Vec<Method> = Vec::new();
		for entry in &self.routes {
			if entry.pattern.is_match(path) || entry.pattern.is_match(&toggled) {
				for method in &entry.methods {
					if !allowed.contains(method) {
						allowed.push(method.clone());
					}
				}
			}
		}
		allowed
	}

	fn is_public(&self, path: &str) -> bool {
		let toggled = toggle_trailing_slash(path);
		self.public
			.iter()
			.any(|pattern| pattern.is_match(path) || pattern.is_match(&toggled))
	}
}

#[async_trait]
impl Handler for ApiRouter {
	async fn handle(&self, request: Request) -> reinhardt::Result<Response> {
		let path = request.path().to_string();
		let method = request.method.clone();
		let allowed = self.allowed_methods(&path);

		if !allowed.is_empty() && !self.is_public(&path) && request.user_id().is_err() {
			return Ok(Error::NotAuthenticated.into_response());
		}

		match self.router.handle(request).await {
			Ok(response) => Ok(response),
			Err(reinhardt::Error::MethodNotAllowed(_)) => {
				Ok(Error::MethodNotAllowed { method, allowed }.into_response())
			}
			Err(e) => Ok(Error::from(e).into_response()),
		}
	}
}

fn compile(path: &str) -> Result<PathPattern> {
	let pattern = match path.split_once("{*") {
		Some((head, tail)) => format!("{}{{<path:{}>}}", head, tail.trim_end_matches('}')),
		None => path.to_string(),
	};
	PathPattern::new(pattern).map_err(|e| Error::Internal(format!("Bad route {}: {}", path, e)))
}

fn toggle_trailing_slash(path: &str) -> String {
	match path.strip_suffix('/') {
		Some(stripped) if !stripped.is_empty() => stripped.to_string(),
		Some(_) => path.to_string(),
		None => format!("{}/", path),
	}
}
