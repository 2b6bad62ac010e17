use api_types::score::{ScoreEntryView, ScoreHistoryResponse, ScoreOverride};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, convert::score_entry_view, server::ServerState, user};

/// Ordered chain, oldest first. Empty when the user has no score yet.
pub async fn history(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<ScoreHistoryResponse>, ServerError> {
    let entries = state.engine.score_history(&user.username, &user_id).await?;
    let current = entries.last().map(|entry| entry.new_score);
    Ok(Json(ScoreHistoryResponse {
        user_id,
        current,
        entries: entries.into_iter().map(score_entry_view).collect(),
    }))
}

pub async fn initialize(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<ScoreEntryView>), ServerError> {
    let entry = state
        .engine
        .initialize_score(&user.username, &user_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(score_entry_view(entry))))
}

pub async fn override_score(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ScoreOverride>,
) -> Result<Json<ScoreEntryView>, ServerError> {
    let entry = state
        .engine
        .override_score(
            &user.username,
            &user_id,
            payload.new_score,
            &payload.reason,
            Utc::now(),
        )
        .await?;
    Ok(Json(score_entry_view(entry)))
}
