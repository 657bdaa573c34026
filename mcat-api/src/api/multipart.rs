//! Multipart form parsing for catalog create/update

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use mcat_common::catalog::Upload;
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};

/// Name of the file part carrying the attachment
pub const ATTACHMENT_PART: &str = "audio";

/// Text fields and the optional attachment of a catalog form
#[derive(Debug, Default)]
pub struct EntityForm {
    pub fields: HashMap<String, String>,
    pub upload: Option<Upload>,
}

/// Read every part of the request
///
/// The `audio` part becomes the upload; all other parts are text fields.
/// A file part with no name and no bytes (an untouched browser file input)
/// counts as no attachment.
pub async fn read_entity_form(mut multipart: Multipart) -> ApiResult<EntityForm> {
    let mut form = EntityForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == ATTACHMENT_PART {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            form.upload = Some(Upload {
                file_name,
                data: data.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}
