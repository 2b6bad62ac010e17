use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    Currency, ResultEngine,
    locks::EntityLocks,
    rates::{IdentityRates, RateProvider},
    retry::RetryPolicy,
    score::ScorePolicy,
};

mod access;
mod expenses;
mod scores;
mod settlement;
mod shares;
mod splits;
mod sweep;

pub use settlement::SettlementReport;
pub use shares::{PaymentOutcome, ShareDetail};
pub use splits::SplitDetail;
pub use sweep::{ReminderDue, SweepReport};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The split-settlement engine.
///
/// Every write takes the caller explicitly and runs as one short DB
/// transaction under the lock of the entity it mutates.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: EntityLocks,
    score_policy: ScorePolicy,
    rates: Arc<dyn RateProvider>,
    reference_currency: Currency,
    retry: RetryPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn score_policy(&self) -> &ScorePolicy {
        &self.score_policy
    }

    pub fn reference_currency(&self) -> Currency {
        self.reference_currency
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    score_policy: ScorePolicy,
    rates: Option<Arc<dyn RateProvider>>,
    reference_currency: Currency,
    retry: RetryPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn score_policy(mut self, policy: ScorePolicy) -> EngineBuilder {
        self.score_policy = policy;
        self
    }

    /// Exchange rates used to convert expenses into the reference currency.
    /// Defaults to [`IdentityRates`].
    pub fn rates(mut self, rates: Arc<dyn RateProvider>) -> EngineBuilder {
        self.rates = Some(rates);
        self
    }

    pub fn reference_currency(mut self, currency: Currency) -> EngineBuilder {
        self.reference_currency = currency;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> EngineBuilder {
        self.retry = retry;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.score_policy.validate()?;
        Ok(Engine {
            database: self.database,
            locks: EntityLocks::default(),
            score_policy: self.score_policy,
            rates: self.rates.unwrap_or_else(|| Arc::new(IdentityRates)),
            reference_currency: self.reference_currency,
            retry: self.retry,
        })
    }
}
