use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Inr,
}

/// Interest compounding period or reminder cadence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

pub mod expense {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ExpenseAnnotations {
        pub is_verified: bool,
        pub image_url: Option<String>,
        pub emotional_state: Option<String>,
        pub is_impulsive: bool,
        /// 0..=100
        pub mindfulness_score: f64,
        pub is_recurring: bool,
        pub is_essential: bool,
        pub payment_mode: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub amount_minor: i64,
        /// Defaults to EUR.
        pub currency: Option<Currency>,
        pub category: String,
        pub group_id: Option<String>,
        pub tags: Option<Vec<String>>,
        pub description: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub date: DateTime<FixedOffset>,
        pub annotations: Option<ExpenseAnnotations>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
        pub converted_amount_minor: i64,
        pub reference_currency: Currency,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseList {
        /// Include retracted expenses.
        pub include_deleted: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub user_id: String,
        pub group_id: Option<String>,
        pub amount_minor: i64,
        pub currency: Currency,
        pub converted_amount_minor: i64,
        pub reference_currency: Currency,
        pub category: String,
        pub tags: Vec<String>,
        pub description: Option<String>,
        pub date: DateTime<Utc>,
        pub annotations: ExpenseAnnotations,
        pub deleted_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod split {
    use std::collections::BTreeMap;

    use super::*;

    /// How an expense is divided. Amounts are minor units, percentages basis
    /// points (10000 = 100%).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum SplitPolicy {
        Equal,
        Percentage { bps: BTreeMap<String, i64> },
        Custom { amounts_minor: BTreeMap<String, i64> },
        Shares { weights: BTreeMap<String, u32> },
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementStatus {
        Open,
        PartiallySettled,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub expense_id: Uuid,
        pub group_id: String,
        pub policy: SplitPolicy,
        pub participants: Vec<String>,
        pub due_date: DateTime<FixedOffset>,
        /// Defaults to the due date.
        pub grace_end_date: Option<DateTime<FixedOffset>>,
        pub needs_approval: Option<bool>,
        pub settlement_priority: Option<i32>,
        /// Basis points per accrual period.
        pub interest_rate_bps: Option<i64>,
        pub accrual_period: Option<Period>,
        pub reminder_frequency: Option<Period>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitCorrection {
        pub policy: SplitPolicy,
        /// Keeps the current participants when absent.
        pub participants: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: Uuid,
        pub expense_id: Uuid,
        pub group_id: String,
        pub created_by: String,
        pub total_amount_minor: i64,
        pub currency: Currency,
        pub policy: SplitPolicy,
        pub remainder_holder: String,
        pub settlement_priority: i32,
        pub due_date: DateTime<Utc>,
        pub grace_end_date: DateTime<Utc>,
        pub needs_approval: bool,
        pub status: SettlementStatus,
        pub shares: Vec<crate::share::ShareView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementEvent {
        pub user_id: String,
        pub share_id: Uuid,
        pub on_time: bool,
        pub paid_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub split_id: Uuid,
        pub status: SettlementStatus,
        pub events: Vec<SettlementEvent>,
    }
}

pub mod share {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ShareStatus {
        Pending,
        PartiallyPaid,
        Paid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareView {
        pub id: Uuid,
        pub split_id: Uuid,
        pub user_id: String,
        pub amount_minor: i64,
        pub paid_minor: i64,
        pub interest_accrued_minor: i64,
        pub outstanding_minor: i64,
        pub interest_rate_bps: i64,
        pub is_paid: bool,
        pub paid_at: Option<DateTime<Utc>>,
        pub status: ShareStatus,
        pub next_reminder_date: Option<DateTime<Utc>>,
        pub reminder_frequency: Option<Period>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount_minor: i64,
        /// Optional: if absent, server uses now().
        pub paid_at: Option<DateTime<FixedOffset>>,
        pub method: Option<String>,
        /// Optional idempotency key for safely retrying the same payment.
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub paid_at: DateTime<Utc>,
        pub method: String,
        pub recorded_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentRecorded {
        pub share: ShareView,
        pub payment: PaymentView,
        /// The idempotency key matched a payment already applied.
        pub replayed: bool,
        pub settlement: Option<crate::split::SettlementView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareDetailResponse {
        pub share: ShareView,
        pub payments: Vec<PaymentView>,
        pub overdue: bool,
    }
}

pub mod score {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ScoreEntryKind {
        Initial,
        Adjustment,
        Override,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ScoreEntryView {
        pub seq: i64,
        pub old_score: f64,
        pub new_score: f64,
        pub reason: String,
        pub kind: ScoreEntryKind,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ScoreHistoryResponse {
        pub user_id: String,
        /// `None` when the user has no history yet.
        pub current: Option<f64>,
        pub entries: Vec<ScoreEntryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ScoreOverride {
        pub new_score: f64,
        pub reason: String,
    }
}
