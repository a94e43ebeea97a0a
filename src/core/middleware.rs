//! Request logging and body size limit

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reinhardt::{Handler, Middleware, Request, Response};

use crate::core::exception::Error;

/// Logs method, path, status and latency of every request
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(
		&self,
		request: Request,
		next: Arc<dyn Handler>,
	) -> reinhardt::Result<Response> {
		let method = request.method.clone();
		let path = request.path().to_string();
		let started = Instant::now();

		let result = next.handle(request).await;

		let elapsed_ms = started.elapsed().as_millis() as u64;
		match &result {
			Ok(response) if response.status.is_server_error() => {
				tracing::error!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request");
			}
			Ok(response) => {
				tracing::info!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request");
			}
			Err(e) => {
				tracing::error!(%method, %path, error = %e, elapsed_ms, "request failed");
			}
		}

		result
	}
}

/// Rejects bodies larger than `limit` bytes with 413
///
/// The server itself refuses anything above 10 MiB before a handler runs.
pub struct BodySizeLimitMiddleware {
	limit: usize,
}

impl BodySizeLimitMiddleware {
	pub fn new(limit: usize) -> Self {
		Self { limit }
	}

	fn declared_length(request: &Request) -> Option<usize> {
		request
			.get_header("content-length")
			.and_then(|value| value.trim().parse().ok())
	}
}

#[async_trait]
impl Middleware for BodySizeLimitMiddleware {
	async fn process(
		&self,
		request: Request,
		next: Arc<dyn Handler>,
	) -> reinhardt::Result<Response> {
		let length = Self::declared_length(&request)
			.unwrap_or(0)
			.max(request.body().len());
		if length > self.limit {
			tracing::warn!(length, limit = self.limit, "request body too large");
			return Ok(Error::PayloadTooLarge { limit: self.limit }.into_response());
		}
		next.handle(request).await
	}
}
