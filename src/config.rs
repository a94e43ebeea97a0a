//! Project configuration: settings, shared state and URL wiring

pub mod settings;
pub mod state;
pub mod urls;
pub mod views;
