use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QuerySelect, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    MoneyCents, ResultEngine, locks::LockKey, retry::retry_transient, split_shares,
    util::parse_uuid,
};

use super::{Engine, with_tx};

/// A reminder that fell due during a sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReminderDue {
    pub share_id: Uuid,
    pub user_id: String,
    pub split_expense_id: Uuid,
    pub remind_at: DateTime<Utc>,
    pub outstanding: MoneyCents,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub splits_processed: usize,
    pub interest_accrued: MoneyCents,
    pub reminders: Vec<ReminderDue>,
    /// Splits that still failed after retrying, with the error message.
    pub failures: Vec<(Uuid, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SweepScope {
    InterestOnly,
    InterestAndReminders,
}

#[derive(Debug, Default)]
struct SplitSweep {
    interest: MoneyCents,
    reminders: Vec<ReminderDue>,
}

impl Engine {
    /// Accrues interest on every unpaid live share up to `as_of`.
    ///
    /// Returns the total interest added. Running it twice for the same
    /// instant adds nothing the second time.
    pub async fn accrue_interest(&self, as_of: DateTime<Utc>) -> ResultEngine<MoneyCents> {
        let report = self.sweep(as_of, SweepScope::InterestOnly).await?;
        Ok(report.interest_accrued)
    }

    /// Background sweep: accrues interest and advances every due reminder.
    ///
    /// Each split is handled in its own transaction under its lock, so the
    /// sweep can stop between splits without leaving partial state.
    pub async fn run_sweep(&self, as_of: DateTime<Utc>) -> ResultEngine<SweepReport> {
        self.sweep(as_of, SweepScope::InterestAndReminders).await
    }

    async fn sweep(&self, as_of: DateTime<Utc>, scope: SweepScope) -> ResultEngine<SweepReport> {
        let split_ids: Vec<String> = split_shares::Entity::find()
            .select_only()
            .column(split_shares::Column::SplitExpenseId)
            .distinct()
            .filter(split_shares::Column::IsPaid.eq(false))
            .filter(split_shares::Column::SupersededAt.is_null())
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut report = SweepReport::default();
        for raw_id in split_ids {
            let split_id = parse_uuid(&raw_id, "split")?;
            let result = retry_transient(self.retry, "sweep", || {
                self.sweep_split(split_id, as_of, scope)
            })
            .await;
            match result {
                Ok(done) => {
                    report.splits_processed += 1;
                    report.interest_accrued = report.interest_accrued + done.interest;
                    report.reminders.extend(done.reminders);
                }
                Err(err) => {
                    tracing::error!("sweep of split {split_id} failed: {err}");
                    report.failures.push((split_id, err.to_string()));
                }
            }
        }

        tracing::info!(
            "sweep as of {as_of}: {} splits, {} interest, {} reminders, {} failures",
            report.splits_processed,
            report.interest_accrued,
            report.reminders.len(),
            report.failures.len()
        );
        Ok(report)
    }

    async fn sweep_split(
        &self,
        split_id: Uuid,
        as_of: DateTime<Utc>,
        scope: SweepScope,
    ) -> ResultEngine<SplitSweep> {
        let _guard = self.locks.lock(LockKey::Split(split_id.to_string())).await;
        with_tx!(self, |db_tx| {
            let split = self.require_split(&db_tx, split_id).await?;
            let mut done = SplitSweep::default();

            for mut share in self.live_shares(&db_tx, split_id).await? {
                if share.is_paid {
                    continue;
                }
                let cursor = share.last_accrual_at;
                let added = share.accrue_interest(split.grace_end_date, split.due_date, as_of)?;
                done.interest = done.interest + added;

                let mut reminded = None;
                if scope == SweepScope::InterestAndReminders {
                    // Catch up on missed runs with a single reminder.
                    while let Some(remind_at) = share.next_reminder_date.filter(|at| *at <= as_of) {
                        if share.schedule_next_reminder()?.is_none() {
                            break;
                        }
                        reminded.get_or_insert(remind_at);
                    }
                }

                if added.is_zero() && reminded.is_none() && cursor == share.last_accrual_at {
                    continue;
                }
                let active = split_shares::ActiveModel {
                    id: ActiveValue::Set(share.id.to_string()),
                    interest_accrued_minor: ActiveValue::Set(share.interest_accrued.cents()),
                    last_accrual_at: ActiveValue::Set(share.last_accrual_at),
                    next_reminder_date: ActiveValue::Set(share.next_reminder_date),
                    ..Default::default()
                };
                active.update(&db_tx).await?;

                if let Some(remind_at) = reminded {
                    done.reminders.push(ReminderDue {
                        share_id: share.id,
                        user_id: share.user_id.clone(),
                        split_expense_id: split_id,
                        remind_at,
                        outstanding: share.outstanding(),
                    });
                }
            }
            Ok(done)
        })
    }
}
