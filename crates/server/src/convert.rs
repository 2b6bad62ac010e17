//! Conversions between engine values and wire types.

use api_types::{
    Currency, Period,
    expense::{ExpenseAnnotations, ExpenseView},
    score::{ScoreEntryKind, ScoreEntryView},
    share::{PaymentView, ShareStatus, ShareView},
    split::{SettlementEvent, SettlementStatus, SettlementView, SplitPolicy, SplitView},
};

pub fn currency_in(currency: Currency) -> engine::Currency {
    match currency {
        Currency::Eur => engine::Currency::Eur,
        Currency::Usd => engine::Currency::Usd,
        Currency::Gbp => engine::Currency::Gbp,
        Currency::Inr => engine::Currency::Inr,
    }
}

pub fn currency_out(currency: engine::Currency) -> Currency {
    match currency {
        engine::Currency::Eur => Currency::Eur,
        engine::Currency::Usd => Currency::Usd,
        engine::Currency::Gbp => Currency::Gbp,
        engine::Currency::Inr => Currency::Inr,
    }
}

pub fn period_in(period: Period) -> engine::Period {
    match period {
        Period::Daily => engine::Period::Daily,
        Period::Weekly => engine::Period::Weekly,
        Period::Biweekly => engine::Period::Biweekly,
        Period::Monthly => engine::Period::Monthly,
    }
}

fn period_out(period: engine::Period) -> Period {
    match period {
        engine::Period::Daily => Period::Daily,
        engine::Period::Weekly => Period::Weekly,
        engine::Period::Biweekly => Period::Biweekly,
        engine::Period::Monthly => Period::Monthly,
    }
}

pub fn policy_in(policy: SplitPolicy) -> engine::SplitPolicy {
    match policy {
        SplitPolicy::Equal => engine::SplitPolicy::Equal,
        SplitPolicy::Percentage { bps } => engine::SplitPolicy::Percentage { bps },
        SplitPolicy::Custom { amounts_minor } => engine::SplitPolicy::Custom { amounts_minor },
        SplitPolicy::Shares { weights } => engine::SplitPolicy::Shares { weights },
    }
}

fn policy_out(policy: engine::SplitPolicy) -> SplitPolicy {
    match policy {
        engine::SplitPolicy::Equal => SplitPolicy::Equal,
        engine::SplitPolicy::Percentage { bps } => SplitPolicy::Percentage { bps },
        engine::SplitPolicy::Custom { amounts_minor } => SplitPolicy::Custom { amounts_minor },
        engine::SplitPolicy::Shares { weights } => SplitPolicy::Shares { weights },
    }
}

pub fn annotations_in(annotations: ExpenseAnnotations) -> engine::ExpenseAnnotations {
    engine::ExpenseAnnotations {
        is_verified: annotations.is_verified,
        image_url: annotations.image_url,
        emotional_state: annotations.emotional_state,
        is_impulsive: annotations.is_impulsive,
        mindfulness_score: annotations.mindfulness_score,
        is_recurring: annotations.is_recurring,
        is_essential: annotations.is_essential,
        payment_mode: annotations.payment_mode,
    }
}

pub fn expense_view(expense: engine::Expense) -> ExpenseView {
    let annotations = expense.annotations;
    ExpenseView {
        id: expense.id,
        user_id: expense.user_id,
        group_id: expense.group_id,
        amount_minor: expense.amount.cents(),
        currency: currency_out(expense.currency),
        converted_amount_minor: expense.converted_amount.cents(),
        reference_currency: currency_out(expense.reference_currency),
        category: expense.category,
        tags: expense.tags,
        description: expense.description,
        date: expense.date,
        annotations: ExpenseAnnotations {
            is_verified: annotations.is_verified,
            image_url: annotations.image_url,
            emotional_state: annotations.emotional_state,
            is_impulsive: annotations.is_impulsive,
            mindfulness_score: annotations.mindfulness_score,
            is_recurring: annotations.is_recurring,
            is_essential: annotations.is_essential,
            payment_mode: annotations.payment_mode,
        },
        deleted_at: expense.deleted_at,
    }
}

fn status_out(status: engine::SettlementStatus) -> SettlementStatus {
    match status {
        engine::SettlementStatus::Open => SettlementStatus::Open,
        engine::SettlementStatus::PartiallySettled => SettlementStatus::PartiallySettled,
        engine::SettlementStatus::Settled => SettlementStatus::Settled,
    }
}

pub fn share_view(share: engine::SplitShare) -> ShareView {
    ShareView {
        id: share.id,
        split_id: share.split_expense_id,
        status: match share.status() {
            engine::ShareStatus::Pending => ShareStatus::Pending,
            engine::ShareStatus::PartiallyPaid => ShareStatus::PartiallyPaid,
            engine::ShareStatus::Paid => ShareStatus::Paid,
        },
        outstanding_minor: share.outstanding().cents(),
        user_id: share.user_id,
        amount_minor: share.amount.cents(),
        paid_minor: share.paid.cents(),
        interest_accrued_minor: share.interest_accrued.cents(),
        interest_rate_bps: share.interest_rate_bps,
        is_paid: share.is_paid,
        paid_at: share.paid_at,
        next_reminder_date: share.next_reminder_date,
        reminder_frequency: share.reminder_frequency.map(period_out),
    }
}

pub fn split_view(detail: engine::SplitDetail) -> SplitView {
    let split = detail.split;
    SplitView {
        id: split.id,
        expense_id: split.expense_id,
        group_id: split.group_id,
        created_by: split.created_by,
        total_amount_minor: split.total_amount.cents(),
        currency: currency_out(split.currency),
        policy: policy_out(split.policy),
        remainder_holder: split.remainder_holder,
        settlement_priority: split.settlement_priority,
        due_date: split.due_date,
        grace_end_date: split.grace_end_date,
        needs_approval: split.needs_approval,
        status: status_out(detail.status),
        shares: detail.shares.into_iter().map(share_view).collect(),
    }
}

pub fn status_view(detail: &engine::SplitDetail) -> SettlementView {
    SettlementView {
        split_id: detail.split.id,
        status: status_out(detail.status),
        events: Vec::new(),
    }
}

pub fn settlement_view(report: engine::SettlementReport) -> SettlementView {
    SettlementView {
        split_id: report.split_id,
        status: status_out(report.status),
        events: report
            .events
            .into_iter()
            .map(|event| SettlementEvent {
                user_id: event.user_id,
                share_id: event.share_id,
                on_time: event.on_time,
                paid_at: event.paid_at,
            })
            .collect(),
    }
}

pub fn payment_view(payment: engine::Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        amount_minor: payment.amount.cents(),
        paid_at: payment.paid_at,
        method: payment.method,
        recorded_by: payment.recorded_by,
    }
}

pub fn score_entry_view(entry: engine::ScoreEntry) -> ScoreEntryView {
    ScoreEntryView {
        seq: entry.seq,
        old_score: entry.old_score,
        new_score: entry.new_score,
        reason: entry.reason,
        kind: match entry.kind {
            engine::ScoreEntryKind::Initial => ScoreEntryKind::Initial,
            engine::ScoreEntryKind::Adjustment => ScoreEntryKind::Adjustment,
            engine::ScoreEntryKind::Override => ScoreEntryKind::Override,
        },
        timestamp: entry.timestamp,
    }
}
