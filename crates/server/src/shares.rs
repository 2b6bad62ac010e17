use api_types::share::{PaymentNew, PaymentRecorded, ShareDetailResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::RecordPaymentCmd;
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{payment_view, settlement_view, share_view},
    server::ServerState,
    user,
};

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<ShareDetailResponse>, ServerError> {
    let detail = state
        .engine
        .share_detail(&user.username, share_id, Utc::now())
        .await?;
    Ok(Json(ShareDetailResponse {
        share: share_view(detail.share),
        payments: detail.payments.into_iter().map(payment_view).collect(),
        overdue: detail.overdue,
    }))
}

/// Records a payment. A retried request with the same idempotency key
/// answers `200` with the payment already applied instead of `201`.
pub async fn pay(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(share_id): Path<Uuid>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentRecorded>), ServerError> {
    let paid_at = payload
        .paid_at
        .map_or_else(Utc::now, |at| at.with_timezone(&Utc));
    let mut cmd = RecordPaymentCmd::new(user.username, share_id, payload.amount_minor, paid_at);
    if let Some(method) = payload.method {
        cmd = cmd.method(method);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let outcome = state.engine.record_payment(cmd).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(PaymentRecorded {
            share: share_view(outcome.share),
            payment: payment_view(outcome.payment),
            replayed: outcome.replayed,
            settlement: outcome.settlement.map(settlement_view),
        }),
    ))
}
