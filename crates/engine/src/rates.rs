//! Currency conversion collaborator.
//!
//! The engine never computes exchange rates itself: it asks a [`RateProvider`]
//! for the rate between an expense currency and the reference currency and
//! stores the converted amount on the expense.

use std::collections::HashMap;

use crate::{Currency, EngineError, MoneyCents, ResultEngine};

/// Scale of a rate returned by [`RateProvider::rate_bps`] (`10_000` = 1.0).
pub const RATE_SCALE: i64 = 10_000;

/// Exchange rate lookup.
pub trait RateProvider: Send + Sync + std::fmt::Debug {
    /// Returns how many units of `to` one unit of `from` buys, scaled by
    /// [`RATE_SCALE`].
    fn rate_bps(&self, from: Currency, to: Currency) -> ResultEngine<i64>;
}

/// Converts `amount` from `from` into `to` using `provider`.
pub(crate) fn convert(
    provider: &dyn RateProvider,
    amount: MoneyCents,
    from: Currency,
    to: Currency,
) -> ResultEngine<MoneyCents> {
    if from == to {
        return Ok(amount);
    }
    let rate = provider.rate_bps(from, to)?;
    if rate <= 0 {
        return Err(EngineError::CurrencyMismatch(format!(
            "invalid rate {from} -> {to}"
        )));
    }
    amount
        .mul_ratio(rate, RATE_SCALE)
        .ok_or_else(|| EngineError::InvalidAmount("converted amount too large".to_string()))
}

/// Only converts a currency into itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityRates;

impl RateProvider for IdentityRates {
    fn rate_bps(&self, from: Currency, to: Currency) -> ResultEngine<i64> {
        if from == to {
            return Ok(RATE_SCALE);
        }
        Err(EngineError::CurrencyMismatch(format!(
            "no rate available for {from} -> {to}"
        )))
    }
}

/// Static rate table, usually loaded from settings.
///
/// The inverse direction is derived when only one side is configured.
#[derive(Clone, Debug, Default)]
pub struct FixedRates {
    rates: HashMap<(Currency, Currency), i64>,
}

impl FixedRates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rate(mut self, from: Currency, to: Currency, rate_bps: i64) -> Self {
        self.rates.insert((from, to), rate_bps);
        self
    }
}

impl RateProvider for FixedRates {
    fn rate_bps(&self, from: Currency, to: Currency) -> ResultEngine<i64> {
        if from == to {
            return Ok(RATE_SCALE);
        }
        if let Some(rate) = self.rates.get(&(from, to)) {
            return Ok(*rate);
        }
        if let Some(inverse) = self.rates.get(&(to, from)).filter(|r| **r > 0) {
            let scaled = crate::money::div_round_half_even(
                i128::from(RATE_SCALE) * i128::from(RATE_SCALE),
                i128::from(*inverse),
            )
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| EngineError::CurrencyMismatch("rate overflow".to_string()))?;
            return Ok(scaled);
        }
        Err(EngineError::CurrencyMismatch(format!(
            "no rate available for {from} -> {to}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_cross_currency() {
        assert_eq!(IdentityRates.rate_bps(Currency::Eur, Currency::Eur), Ok(RATE_SCALE));
        assert!(IdentityRates.rate_bps(Currency::Eur, Currency::Usd).is_err());
    }

    #[test]
    fn fixed_rates_convert_both_directions() {
        let rates = FixedRates::new().with_rate(Currency::Usd, Currency::Eur, 8_000);
        let eur = convert(&rates, MoneyCents::new(10_000), Currency::Usd, Currency::Eur).unwrap();
        assert_eq!(eur, MoneyCents::new(8_000));

        let usd = convert(&rates, MoneyCents::new(8_000), Currency::Eur, Currency::Usd).unwrap();
        assert_eq!(usd, MoneyCents::new(10_000));
    }
}
