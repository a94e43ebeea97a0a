//! Users app
//!
//! Email based accounts, token issuing and the authentication middleware.

pub mod authentication;
pub mod models;
pub mod serializers;
pub mod urls;
pub mod views;
