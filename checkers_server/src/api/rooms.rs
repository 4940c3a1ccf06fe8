//! Read-only room lookups.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use checkers::{RoomCode, RoomError};
use serde_json::json;

use super::{AppState, request_id::RequestId};

/// Snapshot of one room.
///
/// The code is matched case-insensitively. Unknown rooms answer `404` with
/// the same `{reason, message}` body the WebSocket protocol uses.
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    request_id: RequestId,
) -> Response {
    let code = RoomCode::from(code);

    match state.directory.snapshot(&code).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => {
            tracing::debug!(
                request_id = %request_id.as_str(),
                room = %code,
                "Room lookup failed: {}",
                e
            );
            let status = match e {
                RoomError::RoomNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = json!({
                "reason": e.reason(),
                "message": e.to_string(),
            });
            (status, Json(body)).into_response()
        }
    }
}
