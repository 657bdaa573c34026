//! HTTP API handlers for mcat-api

pub mod auth;
pub mod catalog;
pub mod health;
pub mod multipart;

pub use auth::require_user;
pub use health::health_routes;
