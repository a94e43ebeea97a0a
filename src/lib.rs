//! # recipe-app
//!
//! A recipe management REST API. Users register with an email address,
//! obtain a bearer token and manage their own recipes, tags and
//! ingredients; recipes can carry an uploaded image.
//!
//! ## Layout
//!
//! - [`core`]: request parsing, route dispatch, middleware, errors and the
//!   SQLite schema, on top of reinhardt's server, router and ORM
//! - [`config`]: settings, shared state and the root URL configuration
//! - [`apps::users`]: accounts and token authentication
//! - [`apps::recipes`]: recipes, tags, ingredients and image upload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_app::config::settings::Settings;
//! use recipe_app::config::state::AppState;
//! use recipe_app::config::urls::application;
//! use reinhardt::server::HttpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let address = settings.bind_address;
//! let state = AppState::from_settings(settings).await?;
//!
//! HttpServer::new(application(state)?).listen(address).await?;
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod config;
pub mod core;

#[cfg(test)]
pub mod test_utils;
