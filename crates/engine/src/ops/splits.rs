use chrono::Utc;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    CreateSplitCmd, EngineError, ResultEngine, SplitExpense, SplitShare, expenses::Tombstones,
    locks::LockKey,
    settlement::{SettlementStatus, settlement_status},
    split::{SplitPolicy, compute_shares},
    split_expenses, split_shares,
    util::{normalize_required_text, unique_violation_as},
};

use super::{Engine, with_tx};

/// A split with its live shares.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SplitDetail {
    pub split: SplitExpense,
    pub shares: Vec<SplitShare>,
    pub status: SettlementStatus,
}

impl SplitDetail {
    fn new(split: SplitExpense, shares: Vec<SplitShare>) -> Self {
        let status = settlement_status(&shares);
        Self {
            split,
            shares,
            status,
        }
    }
}

impl Engine {
    /// Splits an expense and generates one share per participant.
    ///
    /// Only the expense owner may split it, and an expense is split at most
    /// once. Shares are expressed in the reference currency.
    pub async fn create_split(&self, cmd: CreateSplitCmd) -> ResultEngine<SplitDetail> {
        let group_id = normalize_required_text(&cmd.group_id, "group id")?;
        if cmd.grace_end_date < cmd.due_date {
            return Err(EngineError::InvalidAmount(
                "grace period must end on or after the due date".to_string(),
            ));
        }
        if cmd.interest_rate_bps < 0 {
            return Err(EngineError::InvalidAmount(
                "interest rate must be >= 0".to_string(),
            ));
        }

        let detail = with_tx!(self, |db_tx| {
            let expense = self
                .require_expense_owner(&db_tx, cmd.expense_id, &cmd.caller, Tombstones::Exclude)
                .await?;
            let existing = split_expenses::Entity::find()
                .filter(split_expenses::Column::ExpenseId.eq(expense.id.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "split for expense {}",
                    cmd.expense_id
                )));
            }
            for participant in &cmd.participants {
                self.require_user_exists(&db_tx, participant).await?;
            }

            let total = crate::MoneyCents::new(expense.converted_amount_minor);
            let outcome = compute_shares(total, &cmd.policy, &cmd.participants)?;
            let now = Utc::now();
            let split = SplitExpense {
                id: Uuid::new_v4(),
                expense_id: cmd.expense_id,
                group_id,
                created_by: cmd.caller.clone(),
                total_amount: total,
                currency: crate::Currency::try_from(expense.reference_currency.as_str())?,
                policy: cmd.policy.clone(),
                remainder_holder: outcome.remainder_holder.clone(),
                settlement_priority: cmd.settlement_priority,
                grace_end_date: cmd.grace_end_date,
                due_date: cmd.due_date,
                needs_approval: cmd.needs_approval,
                created_at: now,
            };
            split_expenses::ActiveModel::try_from(&split)?
                .insert(&db_tx)
                .await
                .map_err(|err| {
                    unique_violation_as(err, || {
                        EngineError::ExistingKey(format!("split for expense {}", cmd.expense_id))
                    })
                })?;

            let mut shares = Vec::with_capacity(outcome.shares.len());
            for computed in outcome.shares {
                let share = SplitShare::new(
                    split.id,
                    computed.user_id,
                    computed.amount,
                    cmd.interest_rate_bps,
                    cmd.accrual_period,
                    cmd.reminder_frequency,
                    split.due_date,
                    now,
                )?;
                split_shares::ActiveModel::from(&share).insert(&db_tx).await?;
                shares.push(share);
            }

            Ok(SplitDetail::new(split, shares))
        })?;

        tracing::info!(
            "split {} created for expense {}: {} shares of {}, remainder to {}",
            detail.split.id,
            detail.split.expense_id,
            detail.shares.len(),
            detail.split.total_amount,
            detail.split.remainder_holder
        );
        Ok(detail)
    }

    /// Administrative correction: regenerates every share under a new policy.
    ///
    /// Allowed for the split creator (or an administrator) while no payment
    /// has been recorded. Previous shares are kept as superseded rows.
    pub async fn correct_split(
        &self,
        caller: &str,
        split_id: Uuid,
        policy: SplitPolicy,
        participants: Option<Vec<String>>,
    ) -> ResultEngine<SplitDetail> {
        let _guard = self.locks.lock(LockKey::Split(split_id.to_string())).await;
        with_tx!(self, |db_tx| {
            let model = self.require_split(&db_tx, split_id).await?;
            if model.created_by != caller {
                self.require_admin(&db_tx, caller).await?;
            }
            let mut split = SplitExpense::try_from(model)?;
            let old_shares = self.live_shares(&db_tx, split_id).await?;
            if old_shares.iter().any(|s| s.paid.is_positive()) {
                return Err(EngineError::CorrectionRejected(
                    "payments already recorded against this split".to_string(),
                ));
            }
            let template = old_shares.first().ok_or_else(|| {
                EngineError::KeyNotFound(format!("shares of split {split_id}"))
            })?;

            let participants = participants
                .unwrap_or_else(|| old_shares.iter().map(|s| s.user_id.clone()).collect());
            for participant in &participants {
                self.require_user_exists(&db_tx, participant).await?;
            }
            let outcome = compute_shares(split.total_amount, &policy, &participants)?;

            let now = Utc::now();
            split_shares::Entity::update_many()
                .col_expr(split_shares::Column::SupersededAt, Expr::value(Some(now)))
                .filter(split_shares::Column::SplitExpenseId.eq(split_id.to_string()))
                .filter(split_shares::Column::SupersededAt.is_null())
                .exec(&db_tx)
                .await?;

            let mut shares = Vec::with_capacity(outcome.shares.len());
            for computed in outcome.shares {
                let share = SplitShare::new(
                    split.id,
                    computed.user_id,
                    computed.amount,
                    template.interest_rate_bps,
                    template.accrual_period,
                    template.reminder_frequency,
                    split.due_date,
                    now,
                )?;
                split_shares::ActiveModel::from(&share).insert(&db_tx).await?;
                shares.push(share);
            }

            split.policy = policy;
            split.remainder_holder = outcome.remainder_holder;
            let active = split_expenses::ActiveModel {
                id: ActiveValue::Set(split.id.to_string()),
                split_kind: ActiveValue::Set(split.policy.kind().as_str().to_string()),
                policy: ActiveValue::Set(
                    serde_json::to_value(&split.policy)
                        .map_err(|err| EngineError::InvalidSplitPolicy(err.to_string()))?,
                ),
                remainder_holder: ActiveValue::Set(split.remainder_holder.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!("split {split_id} corrected by {caller}");
            Ok(SplitDetail::new(split, shares))
        })
    }

    /// Returns a split with its live shares and current settlement status.
    pub async fn split_detail(&self, caller: &str, split_id: Uuid) -> ResultEngine<SplitDetail> {
        let model = self.require_split(&self.database, split_id).await?;
        self.require_split_read(&self.database, &model, caller)
            .await?;
        let shares = self.live_shares(&self.database, split_id).await?;
        Ok(SplitDetail::new(SplitExpense::try_from(model)?, shares))
    }

    pub(super) async fn require_split<C: ConnectionTrait>(
        &self,
        db: &C,
        split_id: Uuid,
    ) -> ResultEngine<split_expenses::Model> {
        split_expenses::Entity::find_by_id(split_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("split {split_id}")))
    }

    /// Shares of a split that have not been superseded, ordered by user id.
    pub(super) async fn live_shares<C: ConnectionTrait>(
        &self,
        db: &C,
        split_id: Uuid,
    ) -> ResultEngine<Vec<SplitShare>> {
        split_shares::Entity::find()
            .filter(split_shares::Column::SplitExpenseId.eq(split_id.to_string()))
            .filter(split_shares::Column::SupersededAt.is_null())
            .order_by_asc(split_shares::Column::UserId)
            .all(db)
            .await?
            .into_iter()
            .map(SplitShare::try_from)
            .collect()
    }
}
