//! Split-settlement engine.
//!
//! Expenses are split into per-participant shares, shares are paid and accrue
//! interest, settled splits feed an append-only social score chain. Every
//! operation runs over a sea-orm connection; see [`Engine`].

pub use commands::{CreateSplitCmd, NewExpenseCmd, RecordPaymentCmd};
pub use currency::Currency;
pub use error::{EngineError, ErrorKind};
pub use expenses::{Expense, ExpenseAnnotations, Tombstones};
pub use money::MoneyCents;
pub use ops::{
    Engine, EngineBuilder, PaymentOutcome, ReminderDue, SettlementReport, ShareDetail,
    SplitDetail, SweepReport,
};
pub use payments::Payment;
pub use rates::{FixedRates, IdentityRates, RATE_SCALE, RateProvider};
pub use retry::RetryPolicy;
pub use schedule::Period;
pub use score::{INITIAL_SCORE_REASON, ScoreEntryKind, ScorePolicy};
pub use score_history::ScoreEntry;
pub use settlement::{
    SettlementCompleted, SettlementStatus, pending_settlement_events, settlement_status,
};
pub use split::{
    ComputedShare, FULL_PERCENTAGE_BPS, SplitKind, SplitOutcome, SplitPolicy, compute_shares,
};
pub use split_expenses::SplitExpense;
pub use split_shares::{RATE_BPS_SCALE, ShareStatus, SplitShare};
pub use users::{ROLE_ADMIN, ROLE_MEMBER};

mod commands;
mod currency;
mod error;
mod expenses;
mod locks;
mod money;
mod ops;
mod payments;
mod rates;
mod retry;
mod schedule;
mod score;
mod score_history;
mod settlement;
mod split;
mod split_expenses;
mod split_shares;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
