//! Configuration loading and root folder resolution
//!
//! The root folder holds the database file, the upload directory and an
//! optional `config.toml`. It is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `root_folder` key of the user TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "MCAT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "mcat.db";

/// Config file name inside the root folder
pub const CONFIG_FILE: &str = "config.toml";

/// Upper bound for `token_expiry_minutes` (100 years)
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 36525 * 24 * 60;

/// Service settings read from `config.toml`
///
/// Every key is optional; missing keys take the compiled default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Root folder override (only honored in the user config file)
    pub root_folder: Option<PathBuf>,
    /// Listen address
    pub bind_address: String,
    /// Listen port
    pub port: u16,
    /// Upload directory, relative to the root folder unless absolute
    pub upload_dir: PathBuf,
    /// URL prefix under which the upload directory is served
    pub static_url_prefix: String,
    /// Bearer token lifetime
    pub token_expiry_minutes: i64,
    /// Token signing secret; generated and stored in the database when unset
    pub token_secret: Option<String>,
    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
    /// Request body limit for multipart catalog routes
    pub max_upload_bytes: usize,
    /// Require a bearer token on the catalog routes
    pub protect_catalog: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("static"),
            static_url_prefix: "/static".to_string(),
            // One week
            token_expiry_minutes: 60 * 24 * 7,
            token_secret: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_upload_bytes: 100 * 1024 * 1024,
            protect_catalog: false,
        }
    }
}

impl ServiceConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<root>/config.toml`, falling back to the user config file, then defaults
    ///
    /// A missing file is not an error. A malformed one is.
    pub fn load(root_folder: &Path) -> Result<Self> {
        let candidates = [Some(root_folder.join(CONFIG_FILE)), user_config_file()];

        for path in candidates.into_iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded configuration from {}", path.display());
                return Self::from_toml_str(&content);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.token_expiry_minutes <= 0 || self.token_expiry_minutes > MAX_TOKEN_EXPIRY_MINUTES {
            return Err(Error::Config(format!(
                "token_expiry_minutes must be between 1 and {}, got {}",
                MAX_TOKEN_EXPIRY_MINUTES, self.token_expiry_minutes
            )));
        }
        if !self.static_url_prefix.starts_with('/') || self.static_prefix().len() < 2 {
            return Err(Error::Config(format!(
                "static_url_prefix must be an absolute path like /static, got '{}'",
                self.static_url_prefix
            )));
        }
        if let Some(secret) = &self.token_secret {
            if secret.is_empty() {
                return Err(Error::Config("token_secret must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Absolute upload directory for this root folder
    pub fn upload_dir_path(&self, root_folder: &Path) -> PathBuf {
        if self.upload_dir.is_absolute() {
            self.upload_dir.clone()
        } else {
            root_folder.join(&self.upload_dir)
        }
    }

    /// Static URL prefix without a trailing slash
    pub fn static_prefix(&self) -> &str {
        self.static_url_prefix.trim_end_matches('/')
    }
}

/// Database path inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(config_path) = user_config_file().filter(|p| p.exists()) {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// User-level config file (`~/.config/mcat/config.toml` on Linux)
fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mcat").join(CONFIG_FILE))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mcat"))
        .unwrap_or_else(|| PathBuf::from("./mcat_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.token_expiry_minutes, 10080);
        assert_eq!(config.static_prefix(), "/static");
        assert!(!config.protect_catalog);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str("port = 9001\nprotect_catalog = true\n").unwrap();
        assert_eq!(config.port, 9001);
        assert!(config.protect_catalog);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.upload_dir, PathBuf::from("static"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServiceConfig::from_toml_str("token_expiry_minutes = 0").is_err());
        assert!(ServiceConfig::from_toml_str("static_url_prefix = \"static\"").is_err());
        assert!(ServiceConfig::from_toml_str("token_secret = \"\"").is_err());
        assert!(ServiceConfig::from_toml_str("no_such_key = 1").is_err());
    }

    #[test]
    fn test_token_expiry_capped() {
        assert!(ServiceConfig::from_toml_str("token_expiry_minutes = 1000000000000").is_err());
        let at_cap = format!("token_expiry_minutes = {}", MAX_TOKEN_EXPIRY_MINUTES);
        assert!(ServiceConfig::from_toml_str(&at_cap).is_ok());
    }

    #[test]
    fn test_static_prefix_must_survive_trimming() {
        assert!(ServiceConfig::from_toml_str("static_url_prefix = \"//\"").is_err());
        assert!(ServiceConfig::from_toml_str("static_url_prefix = \"/\"").is_err());

        let config = ServiceConfig::from_toml_str("static_url_prefix = \"/media/\"").unwrap();
        assert_eq!(config.static_prefix(), "/media");
    }

    #[test]
    fn test_upload_dir_relative_to_root() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.upload_dir_path(Path::new("/srv/mcat")),
            PathBuf::from("/srv/mcat/static")
        );
    }
}
