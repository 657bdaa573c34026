//! Database models and queries

pub mod init;
pub mod models;
pub mod schema;
pub mod settings;
pub mod users;

pub use init::*;
pub use models::*;
pub use settings::{get_setting, set_setting};
