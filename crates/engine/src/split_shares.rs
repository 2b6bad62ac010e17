//! Split shares: one participant's obligation within a split.
//!
//! A share moves `Pending → PartiallyPaid → Paid`. `Paid` is terminal: the
//! owed amount is frozen and no more interest accrues. Whether a share is
//! overdue is derived from the split due date and never stored.
//!
//! Interest is simple interest on the unpaid principal,
//! `rate_bps / 10_000 * principal * periods`, counted in whole periods from a
//! per-share cursor (`last_accrual_at`). The cursor only ever moves forward by
//! whole periods, so repeated runs for the same instant add nothing and a
//! partial period is picked up by the next run.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, money::div_round_half_even, schedule::Period,
    util::parse_uuid,
};

/// Basis points per unit rate.
pub const RATE_BPS_SCALE: i64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub id: Uuid,
    pub split_expense_id: Uuid,
    pub user_id: String,
    pub amount: MoneyCents,
    pub paid: MoneyCents,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub interest_rate_bps: i64,
    pub interest_accrued: MoneyCents,
    pub accrual_period: Period,
    pub last_accrual_at: Option<DateTime<Utc>>,
    pub next_reminder_date: Option<DateTime<Utc>>,
    pub reminder_frequency: Option<Period>,
    pub settlement_notified: bool,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SplitShare {
    /// Builds a fresh, unpaid share.
    pub fn new(
        split_expense_id: Uuid,
        user_id: String,
        amount: MoneyCents,
        interest_rate_bps: i64,
        accrual_period: Period,
        reminder_frequency: Option<Period>,
        due_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount.cents() < 0 {
            return Err(EngineError::InvalidAmount(
                "share amount must be >= 0".to_string(),
            ));
        }
        if interest_rate_bps < 0 {
            return Err(EngineError::InvalidAmount(
                "interest rate must be >= 0".to_string(),
            ));
        }
        // A zero share owes nothing and starts settled, with no settlement
        // outcome to report.
        let settled = amount.is_zero();
        Ok(Self {
            id: Uuid::new_v4(),
            split_expense_id,
            user_id,
            amount,
            paid: MoneyCents::ZERO,
            is_paid: settled,
            paid_at: settled.then_some(created_at),
            interest_rate_bps,
            interest_accrued: MoneyCents::ZERO,
            accrual_period,
            last_accrual_at: None,
            next_reminder_date: reminder_frequency.and(Some(due_date)),
            reminder_frequency,
            settlement_notified: settled,
            superseded_at: None,
            created_at,
        })
    }

    /// Amount owed including accrued interest.
    pub fn obligation(&self) -> MoneyCents {
        self.amount + self.interest_accrued
    }

    pub fn outstanding(&self) -> MoneyCents {
        (self.obligation() - self.paid).max(MoneyCents::ZERO)
    }

    pub fn status(&self) -> ShareStatus {
        if self.is_paid {
            ShareStatus::Paid
        } else if self.paid.is_positive() {
            ShareStatus::PartiallyPaid
        } else {
            ShareStatus::Pending
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>, due_date: DateTime<Utc>) -> bool {
        now > due_date && !self.is_paid
    }

    /// Applies a payment of `amount` at `at`.
    ///
    /// The share is left untouched when the payment is rejected.
    pub fn apply_payment(&mut self, amount: MoneyCents, at: DateTime<Utc>) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidPayment(format!(
                "payment amount must be > 0, got {amount}"
            )));
        }
        let total_paid = self
            .paid
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidPayment("payment too large".to_string()))?;
        if self.is_paid || total_paid > self.obligation() {
            return Err(EngineError::OverpaymentRejected(format!(
                "paying {amount} exceeds outstanding {}",
                self.outstanding()
            )));
        }
        self.paid = total_paid;
        if self.paid >= self.obligation() {
            self.is_paid = true;
            self.paid_at = Some(at);
        }
        Ok(())
    }

    /// Accrues interest up to `as_of` and returns the amount added.
    ///
    /// Nothing accrues for paid shares, zero rates, or before `grace_end`.
    pub fn accrue_interest(
        &mut self,
        grace_end: DateTime<Utc>,
        due_date: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<MoneyCents> {
        if self.is_paid
            || self.interest_rate_bps <= 0
            || !self.is_overdue(as_of, due_date)
            || as_of <= grace_end
        {
            return Ok(MoneyCents::ZERO);
        }
        let cursor = self
            .last_accrual_at
            .map_or(grace_end, |last| last.max(grace_end));
        let (periods, boundary) = self.accrual_period.whole_periods_between(cursor, as_of)?;
        if periods == 0 {
            return Ok(MoneyCents::ZERO);
        }

        let principal = (self.amount - self.paid).max(MoneyCents::ZERO);
        let raw = i128::from(principal.cents())
            * i128::from(self.interest_rate_bps)
            * i128::from(periods);
        let interest = div_round_half_even(raw, i128::from(RATE_BPS_SCALE))
            .and_then(|v| i64::try_from(v).ok())
            .map(MoneyCents::new)
            .ok_or_else(|| EngineError::InvalidAmount("interest overflow".to_string()))?;

        self.interest_accrued = self
            .interest_accrued
            .checked_add(interest)
            .ok_or_else(|| EngineError::InvalidAmount("interest overflow".to_string()))?;
        self.last_accrual_at = Some(boundary);
        Ok(interest)
    }

    /// Moves the next reminder one frequency step past the previous
    /// reminder date. Returns the new date, or `None` when the share takes no
    /// reminders.
    pub fn schedule_next_reminder(&mut self) -> ResultEngine<Option<DateTime<Utc>>> {
        if self.is_paid {
            return Ok(None);
        }
        let (Some(frequency), Some(previous)) = (self.reminder_frequency, self.next_reminder_date)
        else {
            return Ok(None);
        };
        let next = frequency.advance(previous)?;
        self.next_reminder_date = Some(next);
        Ok(Some(next))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "split_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub split_expense_id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub paid_minor: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub interest_rate_bps: i64,
    pub interest_accrued_minor: i64,
    pub accrual_period: String,
    pub last_accrual_at: Option<DateTimeUtc>,
    pub next_reminder_date: Option<DateTimeUtc>,
    pub reminder_frequency: Option<String>,
    pub settlement_notified: bool,
    pub superseded_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::split_expenses::Entity",
        from = "Column::SplitExpenseId",
        to = "super::split_expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    SplitExpense,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::split_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitExpense.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SplitShare> for ActiveModel {
    fn from(share: &SplitShare) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            split_expense_id: ActiveValue::Set(share.split_expense_id.to_string()),
            user_id: ActiveValue::Set(share.user_id.clone()),
            amount_minor: ActiveValue::Set(share.amount.cents()),
            paid_minor: ActiveValue::Set(share.paid.cents()),
            is_paid: ActiveValue::Set(share.is_paid),
            paid_at: ActiveValue::Set(share.paid_at),
            interest_rate_bps: ActiveValue::Set(share.interest_rate_bps),
            interest_accrued_minor: ActiveValue::Set(share.interest_accrued.cents()),
            accrual_period: ActiveValue::Set(share.accrual_period.as_str().to_string()),
            last_accrual_at: ActiveValue::Set(share.last_accrual_at),
            next_reminder_date: ActiveValue::Set(share.next_reminder_date),
            reminder_frequency: ActiveValue::Set(
                share.reminder_frequency.map(|f| f.as_str().to_string()),
            ),
            settlement_notified: ActiveValue::Set(share.settlement_notified),
            superseded_at: ActiveValue::Set(share.superseded_at),
            created_at: ActiveValue::Set(share.created_at),
        }
    }
}

impl TryFrom<Model> for SplitShare {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "share")?,
            split_expense_id: parse_uuid(&model.split_expense_id, "split")?,
            user_id: model.user_id,
            amount: MoneyCents::new(model.amount_minor),
            paid: MoneyCents::new(model.paid_minor),
            is_paid: model.is_paid,
            paid_at: model.paid_at,
            interest_rate_bps: model.interest_rate_bps,
            interest_accrued: MoneyCents::new(model.interest_accrued_minor),
            accrual_period: Period::try_from(model.accrual_period.as_str())?,
            last_accrual_at: model.last_accrual_at,
            next_reminder_date: model.next_reminder_date,
            reminder_frequency: model
                .reminder_frequency
                .as_deref()
                .map(Period::try_from)
                .transpose()?,
            settlement_notified: model.settlement_notified,
            superseded_at: model.superseded_at,
            created_at: model.created_at,
        })
    }
}
