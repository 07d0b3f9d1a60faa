use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use crate::models::result::{SaveQuizRequest, SaveQuizResponse};
use crate::services::AppState;

/// POST /api/save-quiz
///
/// Persists one submission as a single `UserData` row. `json_data` is
/// stored opaquely; no schema is enforced beyond valid JSON.
pub async fn save_quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!(
        "Saving quiz submission: user_id={}, user_name={}",
        req.user_id,
        req.user_name
    );

    match state
        .store
        .insert(&req.user_name, &req.user_id, &req.json_data)
        .await
    {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(SaveQuizResponse {
                message: "Quiz data saved successfully".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to save quiz submission: {:#}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error saving quiz data to database".to_string(),
            ))
        }
    }
}
