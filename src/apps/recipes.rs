//! Recipes app
//!
//! Per-user recipes with tags, ingredients and an optional image.

pub mod images;
pub mod models;
pub mod serializers;
pub mod urls;
pub mod views;
