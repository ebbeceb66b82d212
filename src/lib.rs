#![doc = "The `taskboard` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, authentication, persistence, routing"]
#![doc = "configuration and error handling for the Taskboard API. It is used by the main"]
#![doc = "binary (`main.rs`) and by the integration tests to construct the application."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
