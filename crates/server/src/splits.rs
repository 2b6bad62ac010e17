use api_types::split::{SettlementView, SplitCorrection, SplitNew, SplitView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::CreateSplitCmd;
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{period_in, policy_in, split_view, status_view},
    server::ServerState,
    user,
};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SplitNew>,
) -> Result<(StatusCode, Json<SplitView>), ServerError> {
    let mut cmd = CreateSplitCmd::new(
        user.username,
        payload.expense_id,
        payload.group_id,
        policy_in(payload.policy),
        payload.participants,
        payload.due_date.with_timezone(&Utc),
    )
    .needs_approval(payload.needs_approval.unwrap_or(false))
    .settlement_priority(payload.settlement_priority.unwrap_or(0));
    if let Some(grace_end) = payload.grace_end_date {
        cmd = cmd.grace_end_date(grace_end.with_timezone(&Utc));
    }
    if let Some(rate_bps) = payload.interest_rate_bps {
        let period = payload.accrual_period.map(period_in).unwrap_or_default();
        cmd = cmd.interest(rate_bps, period);
    }
    if let Some(frequency) = payload.reminder_frequency {
        cmd = cmd.reminders(period_in(frequency));
    }

    let detail = state.engine.create_split(cmd).await?;
    Ok((StatusCode::CREATED, Json(split_view(detail))))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<Uuid>,
) -> Result<Json<SplitView>, ServerError> {
    let detail = state.engine.split_detail(&user.username, split_id).await?;
    Ok(Json(split_view(detail)))
}

/// Regenerates the shares under a new policy while nothing has been paid.
pub async fn correct(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<Uuid>,
    Json(payload): Json<SplitCorrection>,
) -> Result<Json<SplitView>, ServerError> {
    let detail = state
        .engine
        .correct_split(
            &user.username,
            split_id,
            policy_in(payload.policy),
            payload.participants,
        )
        .await?;
    Ok(Json(split_view(detail)))
}

/// Read-only settlement status. Completion events and score changes are
/// emitted by the payment that settles the split, never by this read.
pub async fn status(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    let detail = state.engine.split_detail(&user.username, split_id).await?;
    Ok(Json(status_view(&detail)))
}
