//! Split calculator.
//!
//! Pure functions turning a total amount and a [`SplitPolicy`] into one
//! [`ComputedShare`] per participant. Nothing here touches the database; the
//! caller persists the outcome.
//!
//! Every policy rounds each share half-to-even on the minor unit, then assigns
//! the residual so that the shares always sum to the total exactly:
//!
//! - `Equal`, `Percentage` and `Custom` give it to the first participant by
//!   user id.
//! - `Shares` gives it to the highest weight, ties broken by lowest user id.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

/// `10_000` basis points = 100%.
pub const FULL_PERCENTAGE_BPS: i64 = 10_000;

/// Percentages may drift from 100% by at most one basis point.
const PERCENTAGE_TOLERANCE_BPS: i64 = 1;

/// Custom amounts may drift from the total by at most one minor unit.
const CUSTOM_TOLERANCE_MINOR: i64 = 1;

/// Name of a split algorithm, as stored on the split row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitKind {
    Equal,
    Percentage,
    Custom,
    Shares,
}

impl SplitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Custom => "CUSTOM",
            Self::Shares => "SHARES",
        }
    }
}

impl TryFrom<&str> for SplitKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "EQUAL" => Ok(Self::Equal),
            "PERCENTAGE" => Ok(Self::Percentage),
            "CUSTOM" => Ok(Self::Custom),
            "SHARES" => Ok(Self::Shares),
            other => Err(EngineError::InvalidSplitPolicy(format!(
                "unknown split kind: {other}"
            ))),
        }
    }
}

/// A split policy together with its typed parameters.
///
/// Parameter maps are keyed by user id and must name exactly the participant
/// set of the split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitPolicy {
    Equal,
    /// Per-participant percentage in basis points.
    Percentage { bps: BTreeMap<String, i64> },
    /// Per-participant explicit amount in minor units.
    Custom { amounts_minor: BTreeMap<String, i64> },
    /// Per-participant integer weight.
    Shares { weights: BTreeMap<String, u32> },
}

impl SplitPolicy {
    pub fn kind(&self) -> SplitKind {
        match self {
            Self::Equal => SplitKind::Equal,
            Self::Percentage { .. } => SplitKind::Percentage,
            Self::Custom { .. } => SplitKind::Custom,
            Self::Shares { .. } => SplitKind::Shares,
        }
    }
}

/// One participant's computed obligation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputedShare {
    pub user_id: String,
    pub amount: MoneyCents,
}

/// Result of [`compute_shares`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Shares ordered by user id.
    pub shares: Vec<ComputedShare>,
    /// Residual left after rounding, already folded into the shares.
    pub remainder: MoneyCents,
    /// Participant that absorbed the remainder.
    pub remainder_holder: String,
}

/// Splits `total` among `participants` according to `policy`.
pub fn compute_shares(
    total: MoneyCents,
    policy: &SplitPolicy,
    participants: &[String],
) -> ResultEngine<SplitOutcome> {
    if !total.is_positive() {
        return Err(EngineError::NonPositiveAmount(format!(
            "split total is {total}"
        )));
    }
    let ordered = ordered_participants(participants)?;

    let (rounded, holder) = match policy {
        SplitPolicy::Equal => {
            let count = i64::try_from(ordered.len())
                .map_err(|_| EngineError::InvalidSplitPolicy("too many participants".to_string()))?;
            let each = scale(total, 1, count)?;
            (vec![each; ordered.len()], 0)
        }
        SplitPolicy::Percentage { bps } => {
            ensure_params_match(&ordered, bps.keys(), "percentage")?;
            if bps.values().any(|v| *v < 0) {
                return Err(EngineError::InvalidSplitPolicy(
                    "percentages must be >= 0".to_string(),
                ));
            }
            let sum = checked_sum(bps.values().copied(), "percentages")?;
            if (sum - FULL_PERCENTAGE_BPS).abs() > PERCENTAGE_TOLERANCE_BPS {
                return Err(EngineError::InvalidSplitPolicy(format!(
                    "percentages sum to {sum} bps, expected {FULL_PERCENTAGE_BPS}"
                )));
            }
            let amounts = ordered
                .iter()
                .map(|user| scale(total, bps[*user], FULL_PERCENTAGE_BPS))
                .collect::<ResultEngine<Vec<_>>>()?;
            (amounts, 0)
        }
        SplitPolicy::Custom { amounts_minor } => {
            ensure_params_match(&ordered, amounts_minor.keys(), "custom")?;
            if amounts_minor.values().any(|v| *v < 0) {
                return Err(EngineError::InvalidSplitPolicy(
                    "custom amounts must be >= 0".to_string(),
                ));
            }
            let sum = checked_sum(amounts_minor.values().copied(), "custom amounts")?;
            if (sum - total.cents()).abs() > CUSTOM_TOLERANCE_MINOR {
                return Err(EngineError::InvalidSplitPolicy(format!(
                    "custom amounts sum to {}, expected {total}",
                    MoneyCents::new(sum)
                )));
            }
            let amounts = ordered
                .iter()
                .map(|user| MoneyCents::new(amounts_minor[*user]))
                .collect();
            (amounts, 0)
        }
        SplitPolicy::Shares { weights } => {
            ensure_params_match(&ordered, weights.keys(), "shares")?;
            let sum = checked_sum(weights.values().map(|w| i64::from(*w)), "share weights")?;
            if sum <= 0 {
                return Err(EngineError::InvalidSplitPolicy(
                    "share weights must sum to > 0".to_string(),
                ));
            }
            let amounts = ordered
                .iter()
                .map(|user| scale(total, i64::from(weights[*user]), sum))
                .collect::<ResultEngine<Vec<_>>>()?;
            // `ordered` is sorted by id, so the first maximum is the lowest id.
            let mut holder = 0;
            for (idx, user) in ordered.iter().enumerate() {
                if weights[*user] > weights[ordered[holder]] {
                    holder = idx;
                }
            }
            (amounts, holder)
        }
    };

    let allocated = MoneyCents::new(checked_sum(
        rounded.iter().map(|m| m.cents()),
        "share amounts",
    )?);
    let remainder = total - allocated;
    let amounts = assign_residual(rounded, holder, remainder);

    let shares: Vec<ComputedShare> = ordered
        .iter()
        .zip(amounts)
        .map(|(user, amount)| ComputedShare {
            user_id: (*user).to_string(),
            amount,
        })
        .collect();

    let check = MoneyCents::new(checked_sum(
        shares.iter().map(|s| s.amount.cents()),
        "share amounts",
    )?);
    if check != total || shares.iter().any(|s| s.amount.cents() < 0) {
        return Err(EngineError::InvalidSplitPolicy(format!(
            "shares sum to {check}, expected {total}"
        )));
    }

    Ok(SplitOutcome {
        shares,
        remainder,
        remainder_holder: ordered[holder].to_string(),
    })
}

fn ordered_participants(participants: &[String]) -> ResultEngine<Vec<&str>> {
    if participants.is_empty() {
        return Err(EngineError::EmptyParticipantSet);
    }
    let mut seen = BTreeSet::new();
    for user in participants {
        let user = user.as_str();
        if user.trim().is_empty() {
            return Err(EngineError::InvalidSplitPolicy(
                "participant id must not be empty".to_string(),
            ));
        }
        if !seen.insert(user) {
            return Err(EngineError::InvalidSplitPolicy(format!(
                "duplicate participant: {user}"
            )));
        }
    }
    Ok(seen.into_iter().collect())
}

fn ensure_params_match<'a>(
    ordered: &[&str],
    keys: impl Iterator<Item = &'a String>,
    label: &str,
) -> ResultEngine<()> {
    let keys: Vec<&str> = keys.map(String::as_str).collect();
    if keys != ordered {
        return Err(EngineError::InvalidSplitPolicy(format!(
            "{label} parameters must name exactly the participants"
        )));
    }
    Ok(())
}

fn checked_sum(mut values: impl Iterator<Item = i64>, label: &str) -> ResultEngine<i64> {
    values
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| EngineError::InvalidSplitPolicy(format!("{label} overflow")))
}

fn scale(total: MoneyCents, numerator: i64, denominator: i64) -> ResultEngine<MoneyCents> {
    total
        .mul_ratio(numerator, denominator)
        .ok_or_else(|| EngineError::InvalidSplitPolicy("share amount overflow".to_string()))
}

/// Folds `residual` into `amounts[holder]`.
///
/// A negative residual never drives a share below zero: whatever the holder
/// cannot absorb moves on to the next participants in id order.
fn assign_residual(
    mut amounts: Vec<MoneyCents>,
    holder: usize,
    residual: MoneyCents,
) -> Vec<MoneyCents> {
    if residual.cents() >= 0 {
        amounts[holder] += residual;
        return amounts;
    }
    let mut pending = -residual.cents();
    let len = amounts.len();
    for step in 0..len {
        if pending == 0 {
            break;
        }
        let idx = (holder + step) % len;
        let take = pending.min(amounts[idx].cents());
        amounts[idx] -= MoneyCents::new(take);
        pending -= take;
    }
    amounts
}
