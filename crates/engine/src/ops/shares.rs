use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, Payment, RecordPaymentCmd, ResultEngine, SplitShare,
    locks::LockKey,
    payments,
    retry::retry_transient,
    split_shares::{self, ShareStatus},
    util::{normalize_required_text, parse_uuid, unique_violation_as},
};

use super::{Engine, SettlementReport, with_tx};

/// A share with its payments and derived state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShareDetail {
    pub share: SplitShare,
    pub payments: Vec<Payment>,
    pub status: ShareStatus,
    pub overdue: bool,
    pub outstanding: MoneyCents,
}

/// Result of [`Engine::record_payment`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentOutcome {
    pub share: SplitShare,
    pub payment: Payment,
    /// `true` when the idempotency key matched an already applied payment.
    pub replayed: bool,
    /// Present when this payment completed the share.
    pub settlement: Option<SettlementReport>,
}

impl Engine {
    /// Records a (possibly partial) payment against a share.
    ///
    /// Rejects non-positive amounts with [`EngineError::InvalidPayment`] and
    /// payments beyond `amount + interest` with
    /// [`EngineError::OverpaymentRejected`]; a rejected payment leaves the
    /// share unchanged. When the share becomes paid the split is evaluated
    /// for settlement.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<PaymentOutcome> {
        let amount = MoneyCents::new(cmd.amount_minor);
        if !amount.is_positive() {
            return Err(EngineError::InvalidPayment(format!(
                "payment amount must be > 0, got {amount}"
            )));
        }
        let method = normalize_required_text(&cmd.method, "payment method")?;
        let split_id = self.share_split_id(cmd.share_id).await?;

        let mut outcome = {
            let _guard = self.locks.lock(LockKey::Split(split_id.to_string())).await;
            with_tx!(self, |db_tx| {
                self.apply_payment_tx(&db_tx, &cmd, split_id, amount, method)
                    .await
            })?
        };

        if outcome.replayed {
            tracing::debug!("payment replay on share {}", cmd.share_id);
            return Ok(outcome);
        }

        tracing::info!(
            "payment of {} on share {} by {}, outstanding {}",
            amount,
            outcome.share.id,
            cmd.caller,
            outcome.share.outstanding()
        );

        if outcome.share.is_paid {
            outcome.settlement = Some(self.evaluate_split(split_id).await?);
        }
        Ok(outcome)
    }

    /// Returns a share with its payments. Visible to the share owner and to
    /// whoever may read the split.
    pub async fn share_detail(
        &self,
        caller: &str,
        share_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<ShareDetail> {
        let model = split_shares::Entity::find_by_id(share_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("share {share_id}")))?;
        let share = SplitShare::try_from(model)?;
        let split = self
            .require_split(&self.database, share.split_expense_id)
            .await?;
        if share.user_id != caller {
            self.require_split_read(&self.database, &split, caller)
                .await?;
        }

        let payments = payments::Entity::find()
            .filter(payments::Column::SplitShareId.eq(share_id.to_string()))
            .order_by_asc(payments::Column::PaidAt)
            .order_by_asc(payments::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(ShareDetail {
            status: share.status(),
            overdue: share.is_overdue(now, split.due_date),
            outstanding: share.outstanding(),
            share,
            payments,
        })
    }

    /// Advances the share's next reminder by one frequency step from the
    /// previous reminder date. Returns `None` for paid shares and shares
    /// without reminders.
    pub async fn schedule_next_reminder(
        &self,
        share_id: Uuid,
    ) -> ResultEngine<Option<DateTime<Utc>>> {
        let split_id = self.share_split_id(share_id).await?;
        let _guard = self.locks.lock(LockKey::Split(split_id.to_string())).await;
        retry_transient(self.retry, "schedule_next_reminder", || async {
            with_tx!(self, |db_tx| {
                let mut share = self.require_live_share(&db_tx, share_id).await?;
                let next = share.schedule_next_reminder()?;
                if next.is_some() {
                    let active = split_shares::ActiveModel {
                        id: ActiveValue::Set(share.id.to_string()),
                        next_reminder_date: ActiveValue::Set(share.next_reminder_date),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                }
                Ok(next)
            })
        })
        .await
    }

    async fn apply_payment_tx(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &RecordPaymentCmd,
        split_id: Uuid,
        amount: MoneyCents,
        method: String,
    ) -> ResultEngine<PaymentOutcome> {
        let mut share = self.require_live_share(db_tx, cmd.share_id).await?;
        let split = self.require_split(db_tx, split_id).await?;
        if share.user_id != cmd.caller && split.created_by != cmd.caller {
            self.require_admin(db_tx, &cmd.caller).await?;
        }

        if let Some(key) = cmd.idempotency_key.as_deref() {
            let existing = payments::Entity::find()
                .filter(payments::Column::SplitShareId.eq(cmd.share_id.to_string()))
                .filter(payments::Column::IdempotencyKey.eq(key.to_string()))
                .one(db_tx)
                .await?;
            if let Some(existing) = existing {
                return Ok(PaymentOutcome {
                    share,
                    payment: Payment::try_from(existing)?,
                    replayed: true,
                    settlement: None,
                });
            }
        }

        share.apply_payment(amount, cmd.paid_at)?;

        let payment = Payment {
            id: Uuid::new_v4(),
            split_share_id: share.id,
            amount,
            paid_at: cmd.paid_at,
            method,
            idempotency_key: cmd.idempotency_key.clone(),
            recorded_by: cmd.caller.clone(),
            created_at: Utc::now(),
        };
        payments::ActiveModel::from(&payment)
            .insert(db_tx)
            .await
            .map_err(|err| {
                unique_violation_as(err, || {
                    EngineError::ConcurrentMutation(format!(
                        "payment key already used on share {}",
                        cmd.share_id
                    ))
                })
            })?;

        let active = split_shares::ActiveModel {
            id: ActiveValue::Set(share.id.to_string()),
            paid_minor: ActiveValue::Set(share.paid.cents()),
            is_paid: ActiveValue::Set(share.is_paid),
            paid_at: ActiveValue::Set(share.paid_at),
            ..Default::default()
        };
        active.update(db_tx).await?;

        Ok(PaymentOutcome {
            share,
            payment,
            replayed: false,
            settlement: None,
        })
    }

    async fn share_split_id(&self, share_id: Uuid) -> ResultEngine<Uuid> {
        let model = split_shares::Entity::find_by_id(share_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("share {share_id}")))?;
        parse_uuid(&model.split_expense_id, "split")
    }

    pub(super) async fn require_live_share<C: ConnectionTrait>(
        &self,
        db: &C,
        share_id: Uuid,
    ) -> ResultEngine<SplitShare> {
        let model = split_shares::Entity::find_by_id(share_id.to_string())
            .one(db)
            .await?
            .filter(|m| m.superseded_at.is_none())
            .ok_or_else(|| EngineError::KeyNotFound(format!("share {share_id}")))?;
        SplitShare::try_from(model)
    }
}
