//! Installed applications

pub mod recipes;
pub mod users;
