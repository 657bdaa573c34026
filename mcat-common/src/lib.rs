//! # Media Catalog Common Library
//!
//! Everything below the HTTP layer:
//! - Database initialization and schema
//! - Credential service (password hashing, bearer tokens)
//! - Attachment storage
//! - Generic catalog service for albums, songs and artists
//! - Configuration loading

pub mod attachments;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
