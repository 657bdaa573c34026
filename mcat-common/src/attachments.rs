//! Attachment storage for catalog entries
//!
//! Uploaded files are written into a single upload directory under a
//! generated storage key (`<uuid>[.<ext>]`). The client's filename is kept
//! only as display metadata, so two uploads never collide and no client
//! input ever becomes part of a filesystem path.

use crate::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest file extension carried over into a storage key
const MAX_EXTENSION_LEN: usize = 10;

/// A file held by the store, as recorded on an entity row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Generated file name inside the upload directory
    pub key: String,
    /// Client-supplied file name (final path component only)
    pub original_name: Option<String>,
}

/// Upload directory plus the URL prefix it is served under
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    url_prefix: String,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Upload directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if missing
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Persist `data` under a fresh storage key
    pub async fn store(&self, suggested_name: &str, data: &[u8]) -> Result<StoredAttachment> {
        let key = storage_key_for(suggested_name);
        let path = self.root.join(&key);
        tokio::fs::write(&path, data).await?;
        debug!("Stored attachment {} ({} bytes)", key, data.len());

        Ok(StoredAttachment {
            key,
            original_name: display_name(suggested_name),
        })
    }

    /// Remove a stored file
    ///
    /// Returns `Ok(false)` when the file was already gone. Any other I/O
    /// failure (permissions, a directory in the way) is an error.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed attachment {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Remove a stored file, logging instead of failing
    pub async fn remove_best_effort(&self, key: &str) {
        if let Err(e) = self.remove(key).await {
            warn!("Could not remove attachment {}: {}", key, e);
        }
    }

    /// Public URL for a storage key, e.g. `/static/<key>`
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    /// Filesystem path for a storage key read back from the database
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(Error::Internal(format!("Malformed attachment key: {:?}", key)));
        }
        Ok(self.root.join(key))
    }
}

/// Fresh storage key, keeping a short alphanumeric extension if the client sent one
pub fn storage_key_for(suggested_name: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match extension_of(suggested_name) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

fn extension_of(suggested_name: &str) -> Option<String> {
    let name = display_name(suggested_name)?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Final path component of a client file name, accepting both separators
pub fn display_name(suggested_name: &str) -> Option<String> {
    let name = suggested_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}
