//! Expense ledger endpoints. Every expense is private to its owner.

use api_types::expense::{
    ExpenseAnnotations, ExpenseCreated, ExpenseList, ExpenseListResponse, ExpenseNew, ExpenseView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{NewExpenseCmd, Tombstones};
use uuid::Uuid;

use crate::{
    ServerError,
    convert::{annotations_in, currency_in, currency_out, expense_view},
    server::ServerState,
    user,
};

fn tombstones(include_deleted: Option<bool>) -> Tombstones {
    if include_deleted.unwrap_or(false) {
        Tombstones::Include
    } else {
        Tombstones::Exclude
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let mut cmd = NewExpenseCmd::new(
        user.username,
        payload.amount_minor,
        currency_in(payload.currency.unwrap_or_default()),
        payload.category,
        payload.date.with_timezone(&Utc),
    )
    .tags(payload.tags.unwrap_or_default());
    if let Some(group_id) = payload.group_id {
        cmd = cmd.group_id(group_id);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(annotations) = payload.annotations {
        cmd = cmd.annotations(annotations_in(annotations));
    }

    let expense = state.engine.create_expense(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExpenseCreated {
            id: expense.id,
            converted_amount_minor: expense.converted_amount.cents(),
            reference_currency: currency_out(expense.reference_currency),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseList>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let expenses = state
        .engine
        .list_expenses(&user.username, tombstones(query.include_deleted))
        .await?
        .into_iter()
        .map(expense_view)
        .collect();
    Ok(Json(ExpenseListResponse { expenses }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Query(query): Query<ExpenseList>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state
        .engine
        .expense(&user.username, expense_id, tombstones(query.include_deleted))
        .await?;
    Ok(Json(expense_view(expense)))
}

pub async fn update_annotations(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseAnnotations>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state
        .engine
        .update_expense_annotations(&user.username, expense_id, annotations_in(payload))
        .await?;
    Ok(Json(expense_view(expense)))
}

/// Soft-deletes the expense. The row stays readable with `include_deleted`.
pub async fn retract(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .retract_expense(&user.username, expense_id, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
