use super::{ErrorResponse, SharedState};
use crate::store::models::DocumentContext;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;

/// Optional header carrying the original file name of an upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

pub async fn upload_document(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DocumentContext>, (StatusCode, Json<ErrorResponse>)> {
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    state
        .session
        .upload_document(body.to_vec(), file_name)
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })
}

pub async fn remove_document(State(state): State<SharedState>) -> StatusCode {
    state.session.remove_document();
    StatusCode::NO_CONTENT
}

pub async fn get_document(State(state): State<SharedState>) -> Json<DocumentContext> {
    Json(state.session.document())
}
