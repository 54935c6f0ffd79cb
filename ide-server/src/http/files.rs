//! File CRUD inside a project.
//!
//! Every handler checks the project first (404) and the file name second
//! (400) before touching the request body or the filesystem.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use simple_ide_core::StoreError;

use super::error::ApiError;
use crate::AppState;

/// `content` when it is a JSON string; anything else counts as non-text.
fn text_content(body: &Value) -> Option<&str> {
    body.get("content").and_then(Value::as_str)
}

pub(crate) async fn list_files_handler(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let files = state
        .store
        .list_files(&project_name)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list files."))?;
    Ok(Json(json!({ "files": files })))
}

pub(crate) async fn create_file_handler(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FAILED: &str = "Failed to create file.";

    state
        .store
        .project_dir(&project_name)
        .await
        .map_err(|e| ApiError::store(e, FAILED))?;
    let Json(body) = body.map_err(ApiError::body)?;
    let file_name = body.get("fileName").and_then(Value::as_str).unwrap_or("");

    let name = state
        .store
        .create_file(&project_name, file_name, text_content(&body))
        .await
        .map_err(|e| ApiError::store(e, FAILED))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("File: {name} created!") })),
    ))
}

pub(crate) async fn read_file_handler(
    State(state): State<AppState>,
    Path((project_name, file_name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let data = state
        .store
        .read_file(&project_name, &file_name)
        .await
        .map_err(|e| ApiError::store(e, "Failed to read file."))?;
    Ok(Json(json!({ "data": data })))
}

pub(crate) async fn update_file_handler(
    State(state): State<AppState>,
    Path((project_name, file_name)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    const FAILED: &str = "Failed to update file.";

    let (name, _) = state
        .store
        .existing_file(&project_name, &file_name)
        .await
        .map_err(|e| ApiError::store(e, FAILED))?;
    let Json(body) = body.map_err(ApiError::body)?;
    match body.get("fileName") {
        None | Some(Value::Null) => {}
        Some(Value::String(named)) if named == name.as_str() => {}
        Some(_) => return Err(ApiError::store(StoreError::FileNameMismatch, FAILED)),
    }

    state
        .store
        .update_file(&project_name, name.as_str(), text_content(&body))
        .await
        .map_err(|e| ApiError::store(e, FAILED))?;
    Ok(Json(json!({ "message": format!("{name} has been updated.") })))
}

pub(crate) async fn delete_file_handler(
    State(state): State<AppState>,
    Path((project_name, file_name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let name = state
        .store
        .delete_file(&project_name, &file_name)
        .await
        .map_err(|e| ApiError::store(e, "Failed to delete file."))?;
    Ok(Json(json!({ "message": format!("{name} has been deleted.") })))
}
