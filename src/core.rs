//! Framework glue shared by every app
//!
//! Request parsing, route dispatch, error rendering, request logging and
//! persistence helpers. Apps under [`crate::apps`] only contain models,
//! serializers and views built on top of these pieces.

pub mod db;
pub mod exception;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod routing;
