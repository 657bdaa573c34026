//! Catalog endpoints: `/api/{albums,songs,artists}/...`
//!
//! One set of handlers serves every record kind; the first path segment
//! selects the descriptor.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use mcat_common::catalog::{entity_by_path, EntityDescriptor, EntityService, Record};
use serde::Deserialize;
use serde_json::{json, Value};

use super::multipart::read_entity_form;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

fn descriptor(path: &str) -> ApiResult<&'static EntityDescriptor> {
    entity_by_path(path).ok_or_else(|| ApiError::NotFound(format!("Unknown collection '{}'", path)))
}

fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id '{}'", raw)))
}

fn project(service: &EntityService<'_>, record: &Record) -> ApiResult<Value> {
    serde_json::to_value(service.view(record))
        .map_err(|e| ApiError::Internal(format!("Failed to serialize record: {}", e)))
}

fn project_all(service: &EntityService<'_>, records: &[Record]) -> ApiResult<Json<Value>> {
    let items = records
        .iter()
        .map(|record| project(service, record))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(Value::Array(items)))
}

/// GET /api/:entity/all
pub async fn list_all(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    let records = service.list_all().await?;
    project_all(&service, &records)
}

/// GET /api/:entity/search?query=
pub async fn search(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    let records = service.search(&params.query).await?;
    project_all(&service, &records)
}

/// GET /api/:entity/:id
pub async fn get_one(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    let record = service.get(parse_id(&id)?).await?;
    Ok(Json(project(&service, &record)?))
}

/// POST /api/:entity/create
pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    let form = read_entity_form(multipart).await?;
    let values = service.descriptor().parse_fields(&form.fields)?;

    let record = service.create(values, form.upload).await?;
    Ok(Json(project(&service, &record)?))
}

/// PUT /api/:entity/:id
pub async fn update(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    let id = parse_id(&id)?;
    let form = read_entity_form(multipart).await?;
    let values = service.descriptor().parse_fields(&form.fields)?;

    let record = service.update(id, values, form.upload).await?;
    Ok(Json(project(&service, &record)?))
}

/// DELETE /api/:entity/:id
pub async fn delete(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let service = state.catalog.entity(descriptor(&entity)?);
    service.delete(parse_id(&id)?).await?;

    Ok(Json(json!({
        "message": format!("{} deleted successfully", service.descriptor().display_name),
    })))
}
