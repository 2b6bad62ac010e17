//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense creation,
//! splitting, payments), keeping call sites readable and avoiding long
//! argument lists. `caller` is always the authenticated user performing the
//! write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Currency, ExpenseAnnotations, schedule::Period, split::SplitPolicy};

/// Record a new expense.
#[derive(Clone, Debug)]
pub struct NewExpenseCmd {
    pub caller: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category: String,
    pub group_id: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub annotations: ExpenseAnnotations,
}

impl NewExpenseCmd {
    #[must_use]
    pub fn new(
        caller: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            caller: caller.into(),
            amount_minor,
            currency,
            category: category.into(),
            group_id: None,
            tags: Vec::new(),
            description: None,
            date,
            annotations: ExpenseAnnotations::default(),
        }
    }

    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn annotations(mut self, annotations: ExpenseAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Split an existing expense among participants.
#[derive(Clone, Debug)]
pub struct CreateSplitCmd {
    pub caller: String,
    pub expense_id: Uuid,
    pub group_id: String,
    pub policy: SplitPolicy,
    pub participants: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub grace_end_date: DateTime<Utc>,
    pub needs_approval: bool,
    pub settlement_priority: i32,
    pub interest_rate_bps: i64,
    pub accrual_period: Period,
    pub reminder_frequency: Option<Period>,
}

impl CreateSplitCmd {
    /// Builds a command with no interest, no reminders and the grace period
    /// ending at the due date.
    #[must_use]
    pub fn new(
        caller: impl Into<String>,
        expense_id: Uuid,
        group_id: impl Into<String>,
        policy: SplitPolicy,
        participants: Vec<String>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            caller: caller.into(),
            expense_id,
            group_id: group_id.into(),
            policy,
            participants,
            due_date,
            grace_end_date: due_date,
            needs_approval: false,
            settlement_priority: 0,
            interest_rate_bps: 0,
            accrual_period: Period::Daily,
            reminder_frequency: None,
        }
    }

    #[must_use]
    pub fn grace_end_date(mut self, grace_end_date: DateTime<Utc>) -> Self {
        self.grace_end_date = grace_end_date;
        self
    }

    #[must_use]
    pub fn interest(mut self, rate_bps: i64, period: Period) -> Self {
        self.interest_rate_bps = rate_bps;
        self.accrual_period = period;
        self
    }

    #[must_use]
    pub fn reminders(mut self, frequency: Period) -> Self {
        self.reminder_frequency = Some(frequency);
        self
    }

    #[must_use]
    pub fn needs_approval(mut self, needs_approval: bool) -> Self {
        self.needs_approval = needs_approval;
        self
    }

    #[must_use]
    pub fn settlement_priority(mut self, priority: i32) -> Self {
        self.settlement_priority = priority;
        self
    }
}

/// Record money moved against a share.
#[derive(Clone, Debug)]
pub struct RecordPaymentCmd {
    pub caller: String,
    pub share_id: Uuid,
    pub amount_minor: i64,
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub idempotency_key: Option<String>,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(
        caller: impl Into<String>,
        share_id: Uuid,
        amount_minor: i64,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            caller: caller.into(),
            share_id,
            amount_minor,
            paid_at,
            method: "cash".to_string(),
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
