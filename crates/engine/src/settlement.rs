//! Settlement aggregation over the live shares of a split.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::split_shares::SplitShare;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Open,
    PartiallySettled,
    Settled,
}

/// Emitted once per participant when every share of a split is paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCompleted {
    pub user_id: String,
    pub split_expense_id: Uuid,
    pub share_id: Uuid,
    pub on_time: bool,
    pub paid_at: DateTime<Utc>,
}

/// Derives the completion state from the live shares.
pub fn settlement_status(shares: &[SplitShare]) -> SettlementStatus {
    let paid = shares.iter().filter(|s| s.is_paid).count();
    if !shares.is_empty() && paid == shares.len() {
        SettlementStatus::Settled
    } else if paid > 0 {
        SettlementStatus::PartiallySettled
    } else {
        SettlementStatus::Open
    }
}

/// Events still owed for a settled split: one per paid share whose
/// settlement has not been notified yet.
pub fn pending_settlement_events(
    shares: &[SplitShare],
    due_date: DateTime<Utc>,
) -> Vec<SettlementCompleted> {
    if settlement_status(shares) != SettlementStatus::Settled {
        return Vec::new();
    }
    shares
        .iter()
        .filter(|s| !s.settlement_notified)
        .filter_map(|s| {
            s.paid_at.map(|paid_at| SettlementCompleted {
                user_id: s.user_id.clone(),
                split_expense_id: s.split_expense_id,
                share_id: s.id,
                on_time: paid_at <= due_date,
                paid_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{MoneyCents, schedule::Period};

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
    }

    fn share(user: &str, split: Uuid) -> SplitShare {
        SplitShare::new(
            split,
            user.to_string(),
            MoneyCents::new(1000),
            0,
            Period::Daily,
            None,
            due(),
            due() - Duration::days(3),
        )
        .unwrap()
    }

    #[test]
    fn status_follows_paid_shares() {
        let split = Uuid::new_v4();
        let mut shares = vec![share("alice", split), share("bob", split)];
        assert_eq!(settlement_status(&shares), SettlementStatus::Open);

        shares[0].apply_payment(MoneyCents::new(1000), due()).unwrap();
        assert_eq!(settlement_status(&shares), SettlementStatus::PartiallySettled);
        assert!(pending_settlement_events(&shares, due()).is_empty());

        shares[1]
            .apply_payment(MoneyCents::new(1000), due() + Duration::days(1))
            .unwrap();
        assert_eq!(settlement_status(&shares), SettlementStatus::Settled);

        let events = pending_settlement_events(&shares, due());
        assert_eq!(events.len(), 2);
        assert!(events[0].on_time);
        assert!(!events[1].on_time);
    }

    #[test]
    fn notified_shares_emit_nothing() {
        let split = Uuid::new_v4();
        let mut s = share("alice", split);
        s.apply_payment(MoneyCents::new(1000), due()).unwrap();
        s.settlement_notified = true;
        assert!(pending_settlement_events(&[s], due()).is_empty());
    }
}
