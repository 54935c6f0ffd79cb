use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::{Value, json};
use simple_ide_core::StoreError;

use super::error::ApiError;
use crate::AppState;

pub(crate) async fn list_projects_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let projects = state
        .store
        .list_projects()
        .await
        .map_err(|e| ApiError::store(e, "Failed to list projects."))?;
    Ok(Json(json!({ "projects": projects })))
}

pub(crate) async fn create_project_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body.map_err(ApiError::body)?;
    let raw_name = match body.get("name") {
        None | Some(Value::Null) => "",
        Some(Value::String(name)) => name.as_str(),
        Some(_) => {
            return Err(ApiError::store(
                StoreError::InvalidProjectName,
                "Failed to create a project.",
            ));
        }
    };

    let name = state
        .store
        .create_project(raw_name)
        .await
        .map_err(|e| ApiError::store(e, "Failed to create a project."))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Created project: {name}"),
            "id": name.as_str(),
        })),
    ))
}
