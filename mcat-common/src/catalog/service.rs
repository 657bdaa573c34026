//! Catalog entity service
//!
//! Composes the catalog tables with the attachment store. Every mutation
//! runs inside its own transaction, which rolls back if the handler errors
//! out before commit.

use super::{repo, EntityDescriptor, EntityView, FieldValue, Record};
use crate::attachments::{AttachmentStore, StoredAttachment};
use crate::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Shared handle to the catalog: database pool plus attachment store
#[derive(Clone)]
pub struct CatalogService {
    pool: SqlitePool,
    store: AttachmentStore,
}

impl CatalogService {
    pub fn new(pool: SqlitePool, store: AttachmentStore) -> Self {
        Self { pool, store }
    }

    /// Service for one record kind
    pub fn entity(&self, descriptor: &'static EntityDescriptor) -> EntityService<'_> {
        EntityService {
            descriptor,
            pool: &self.pool,
            store: &self.store,
        }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// CRUD and search for a single record kind
pub struct EntityService<'a> {
    descriptor: &'static EntityDescriptor,
    pool: &'a SqlitePool,
    store: &'a AttachmentStore,
}

impl<'a> EntityService<'a> {
    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// JSON projection of a record of this kind
    pub fn view<'r>(&'r self, record: &'r Record) -> EntityView<'r> {
        EntityView {
            descriptor: self.descriptor,
            record,
            store: self.store,
        }
    }

    fn not_found(&self) -> Error {
        Error::NotFound(format!("{} not found", self.descriptor.display_name))
    }

    pub async fn list_all(&self) -> Result<Vec<Record>> {
        repo::list_all(self.pool, self.descriptor).await
    }

    pub async fn get(&self, id: i64) -> Result<Record> {
        repo::find_by_id(self.pool, self.descriptor, id)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Substring search on the kind's search column; no match is an empty list
    pub async fn search(&self, query: &str) -> Result<Vec<Record>> {
        repo::search(self.pool, self.descriptor, query).await
    }

    pub async fn count(&self) -> Result<i64> {
        repo::count(self.pool, self.descriptor).await
    }

    /// Store the optional upload, then insert the row
    pub async fn create(&self, values: Vec<FieldValue>, upload: Option<Upload>) -> Result<Record> {
        self.check_arity(&values)?;

        let attachment = match upload {
            Some(upload) => Some(self.store.store(&upload.file_name, &upload.data).await?),
            None => None,
        };

        match repo::insert(self.pool, self.descriptor, values, attachment.clone()).await {
            Ok(record) => {
                info!("Created {} {}", self.descriptor.display_name, record.id);
                Ok(record)
            }
            Err(e) => {
                // Do not leave an orphaned file behind
                if let Some(stored) = &attachment {
                    self.store.remove_best_effort(&stored.key).await;
                }
                Err(e)
            }
        }
    }

    /// Overwrite every field; replace the attachment only when a new one is supplied
    ///
    /// The previous file is deleted before the new one is stored. A previous
    /// file that is already gone is fine; any other removal failure aborts
    /// the update. If storing the new file or writing the row fails after
    /// the previous file was dropped, the row is detached from it instead of
    /// keeping a reference to a missing file.
    pub async fn update(
        &self,
        id: i64,
        values: Vec<FieldValue>,
        upload: Option<Upload>,
    ) -> Result<Record> {
        self.check_arity(&values)?;

        let mut tx = self.begin_write().await?;
        let existing = repo::find_by_id(&mut *tx, self.descriptor, id)
            .await?
            .ok_or_else(|| self.not_found())?;

        let Some(upload) = upload else {
            let attachment = existing.attachment;
            self.write_update(tx, id, &values, attachment.as_ref()).await?;
            info!("Updated {} {}", self.descriptor.display_name, id);
            return Ok(Record {
                id,
                values,
                attachment,
            });
        };

        let had_previous = match &existing.attachment {
            Some(previous) => {
                if !self.store.remove(&previous.key).await? {
                    warn!(
                        "Previous attachment {} of {} {} was already missing",
                        previous.key, self.descriptor.display_name, id
                    );
                }
                true
            }
            None => false,
        };

        let stored = match self.store.store(&upload.file_name, &upload.data).await {
            Ok(stored) => stored,
            Err(e) => {
                if had_previous {
                    self.detach(tx, id).await;
                }
                return Err(e);
            }
        };

        let written = repo::update(&mut *tx, self.descriptor, id, &values, Some(&stored)).await;
        if let Err(e) = written {
            self.store.remove_best_effort(&stored.key).await;
            if had_previous {
                self.detach(tx, id).await;
            }
            return Err(e);
        }
        if let Err(e) = tx.commit().await {
            self.store.remove_best_effort(&stored.key).await;
            return Err(e.into());
        }

        info!("Updated {} {}", self.descriptor.display_name, id);
        Ok(Record {
            id,
            values,
            attachment: Some(stored),
        })
    }

    async fn write_update(
        &self,
        mut tx: Transaction<'static, Sqlite>,
        id: i64,
        values: &[FieldValue],
        attachment: Option<&StoredAttachment>,
    ) -> Result<()> {
        if !repo::update(&mut *tx, self.descriptor, id, values, attachment).await? {
            return Err(self.not_found());
        }
        tx.commit().await?;
        Ok(())
    }

    /// Clear the attachment reference of a row whose file was removed
    async fn detach(&self, mut tx: Transaction<'static, Sqlite>, id: i64) {
        let cleared = async move {
            repo::detach_attachment(&mut *tx, self.descriptor, id).await?;
            tx.commit().await?;
            Ok::<_, Error>(())
        }
        .await;

        if let Err(e) = cleared {
            warn!(
                "{} {} still references a removed attachment: {}",
                self.descriptor.display_name, id, e
            );
        }
    }

    /// Remove the row, then best-effort remove its file
    ///
    /// The row deletion stands even if the file cannot be removed.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.begin_write().await?;
        let existing = repo::find_by_id(&mut *tx, self.descriptor, id)
            .await?
            .ok_or_else(|| self.not_found())?;

        repo::delete(&mut *tx, self.descriptor, id).await?;
        tx.commit().await?;

        if let Some(attachment) = &existing.attachment {
            self.store.remove_best_effort(&attachment.key).await;
        }

        info!("Deleted {} {}", self.descriptor.display_name, id);
        Ok(())
    }

    /// Read-then-write transaction holding the write lock from the start
    ///
    /// A deferred transaction that reads first cannot wait for the lock when
    /// it later writes; SQLite fails it with SQLITE_BUSY instead.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    fn check_arity(&self, values: &[FieldValue]) -> Result<()> {
        if values.len() != self.descriptor.fields.len() {
            return Err(Error::InvalidInput(format!(
                "{} expects {} fields, got {}",
                self.descriptor.display_name,
                self.descriptor.fields.len(),
                values.len()
            )));
        }
        Ok(())
    }
}
