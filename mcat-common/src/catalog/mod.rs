//! Catalog record kinds
//!
//! Albums, songs and artists share one shape: an integer id, a short list of
//! typed fields and an optional attachment. Each kind is described by an
//! [`EntityDescriptor`]; the repository, service and HTTP layer are written
//! once against the descriptor.

use crate::attachments::{AttachmentStore, StoredAttachment};
use crate::db::schema::ColumnDefinition;
use crate::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

pub mod repo;
pub mod seed;
pub mod service;

pub use service::{CatalogService, EntityService, Upload};

/// Wire name of the attachment URL in every projection
pub const ATTACHMENT_URL_FIELD: &str = "audio_url";
/// Wire name of the attachment's original file name
pub const ATTACHMENT_NAME_FIELD: &str = "audio_name";

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

impl FieldKind {
    fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
        }
    }
}

/// One required field of a record kind
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Name in forms and JSON
    pub wire_name: &'static str,
    /// Column in the table
    pub column: &'static str,
    pub kind: FieldKind,
}

/// Describes a record kind: table layout, wire names and search column
#[derive(Debug)]
pub struct EntityDescriptor {
    /// URL segment, e.g. `albums`
    pub path: &'static str,
    /// Human-readable name used in messages
    pub display_name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    /// Name of the id in JSON
    pub id_wire_name: &'static str,
    /// Required fields in form/column order
    pub fields: &'static [FieldSpec],
    /// Column matched by substring search
    pub search_column: &'static str,
}

pub static ALBUM: EntityDescriptor = EntityDescriptor {
    path: "albums",
    display_name: "Album",
    table: "albums",
    id_column: "id",
    id_wire_name: "Album_id",
    fields: &[
        FieldSpec {
            wire_name: "Album_title",
            column: "title",
            kind: FieldKind::Text,
        },
        FieldSpec {
            wire_name: "Total_tracks",
            column: "total_tracks",
            kind: FieldKind::Integer,
        },
    ],
    search_column: "title",
};

pub static SONG: EntityDescriptor = EntityDescriptor {
    path: "songs",
    display_name: "Song",
    table: "songs",
    id_column: "id",
    id_wire_name: "Songs_id",
    fields: &[
        FieldSpec {
            wire_name: "Songs_name",
            column: "name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            wire_name: "Gener",
            column: "genre",
            kind: FieldKind::Text,
        },
    ],
    search_column: "name",
};

pub static ARTIST: EntityDescriptor = EntityDescriptor {
    path: "artists",
    display_name: "Artist",
    table: "artists",
    id_column: "id",
    id_wire_name: "Artist_id",
    fields: &[
        FieldSpec {
            wire_name: "Artist_name",
            column: "name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            wire_name: "Country",
            column: "country",
            kind: FieldKind::Text,
        },
    ],
    search_column: "name",
};

/// Every record kind served by the catalog
pub static ENTITIES: [&EntityDescriptor; 3] = [&ALBUM, &SONG, &ARTIST];

/// Find a record kind by its URL segment
pub fn entity_by_path(path: &str) -> Option<&'static EntityDescriptor> {
    ENTITIES.iter().copied().find(|d| d.path == path)
}

impl EntityDescriptor {
    /// Table layout: id, fields, attachment columns
    pub fn columns(&self) -> Vec<ColumnDefinition> {
        let mut columns = vec![ColumnDefinition::new(self.id_column, "INTEGER").primary_key()];
        columns.extend(
            self.fields
                .iter()
                .map(|f| ColumnDefinition::new(f.column, f.kind.sql_type()).not_null()),
        );
        columns.push(ColumnDefinition::new("attachment_key", "TEXT"));
        columns.push(ColumnDefinition::new("attachment_name", "TEXT"));
        columns
    }

    /// Validate submitted form values against the field list
    ///
    /// Every field is required. Integer fields must parse as i64. Text is
    /// taken as submitted.
    pub fn parse_fields(&self, submitted: &HashMap<String, String>) -> Result<Vec<FieldValue>> {
        self.fields
            .iter()
            .map(|spec| {
                let raw = submitted.get(spec.wire_name).ok_or_else(|| {
                    Error::InvalidInput(format!("Missing required field '{}'", spec.wire_name))
                })?;
                match spec.kind {
                    FieldKind::Text => Ok(FieldValue::Text(raw.clone())),
                    FieldKind::Integer => raw.trim().parse::<i64>().map(FieldValue::Integer).map_err(
                        |_| {
                            Error::InvalidInput(format!(
                                "Field '{}' must be an integer, got '{}'",
                                spec.wire_name, raw
                            ))
                        },
                    ),
                }
            })
            .collect()
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
        }
    }
}

/// A stored catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    /// Values in descriptor field order
    pub values: Vec<FieldValue>,
    pub attachment: Option<StoredAttachment>,
}

/// JSON projection of a record: id, fields, attachment URL and name
pub struct EntityView<'a> {
    pub descriptor: &'static EntityDescriptor,
    pub record: &'a Record,
    pub store: &'a AttachmentStore,
}

impl Serialize for EntityView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.descriptor.fields;
        let mut map = serializer.serialize_map(Some(fields.len() + 3))?;
        map.serialize_entry(self.descriptor.id_wire_name, &self.record.id)?;
        for (spec, value) in fields.iter().zip(&self.record.values) {
            map.serialize_entry(spec.wire_name, value)?;
        }
        let attachment = self.record.attachment.as_ref();
        map.serialize_entry(
            ATTACHMENT_URL_FIELD,
            &attachment.map(|a| self.store.public_url(&a.key)),
        )?;
        map.serialize_entry(
            ATTACHMENT_NAME_FIELD,
            &attachment.and_then(|a| a.original_name.as_deref()),
        )?;
        map.end()
    }
}
