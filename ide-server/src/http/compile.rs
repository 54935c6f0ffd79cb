use axum::Json;
use axum::extract::{Path, State};
use simple_ide_core::{CompileError, CompileOutcome};

use super::error::ApiError;
use crate::AppState;

/// Compile an existing `.c` file into an executable named after its stem.
///
/// A compiler that ran and rejected the code is a 200 with `success: false`;
/// a compiler that could not run, or ran out of time, is a 500.
pub(crate) async fn compile_handler(
    State(state): State<AppState>,
    Path((project_name, file_name)): Path<(String, String)>,
) -> Result<Json<CompileOutcome>, ApiError> {
    const FAILED: &str = "Failed to run the compiler.";

    let target = state
        .store
        .compile_target(&project_name, &file_name)
        .await
        .map_err(|e| ApiError::store(e, FAILED))?;
    let source = &target.source;

    let result = state
        .compiler
        .compile(&target.project_dir, source, target.artifact.as_str())
        .await;
    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err @ CompileError::Timeout { .. }) => {
            tracing::error!(project = %project_name, file = %source, error = %err, "compile timed out");
            Err(ApiError::internal("Compilation timed out."))
        }
        Err(err) => {
            tracing::error!(project = %project_name, file = %source, error = %err, "compiler failed to run");
            Err(ApiError::internal(FAILED))
        }
    }
}
