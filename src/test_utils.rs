//! Test utilities
//!
//! - [`fixtures`]: rstest fixtures building an isolated application behind
//!   reinhardt's in-process [`APIClient`](reinhardt::APIClient)
//! - [`factories`]: helpers inserting users, recipes, tags and ingredients

pub mod factories;
pub mod fixtures;
