//! Social score policy and pure score arithmetic.
//!
//! The persisted chain lives in `score_history`; this module only decides
//! what the next value is.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Reason recorded on the seeding entry of every chain.
pub const INITIAL_SCORE_REASON: &str = "Initial score setup";

/// Outer limits of any configured score range.
pub const SCORE_FLOOR: f64 = 0.0;
pub const SCORE_CEILING: f64 = 100.0;

/// Score bounds and the deltas applied for settlement outcomes.
///
/// Passed into the engine at construction so policy changes never touch the
/// engine code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePolicy {
    pub baseline: f64,
    pub on_time_delta: f64,
    pub late_delta: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            on_time_delta: 5.0,
            late_delta: 10.0,
            min: 0.0,
            max: 100.0,
        }
    }
}

impl ScorePolicy {
    /// Checks that the configured values are usable.
    pub fn validate(&self) -> ResultEngine<()> {
        let finite = [
            self.baseline,
            self.on_time_delta,
            self.late_delta,
            self.min,
            self.max,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || self.min >= self.max || self.min < SCORE_FLOOR || self.max > SCORE_CEILING {
            return Err(EngineError::InvalidScoreRange(format!(
                "invalid score bounds [{}, {}]",
                self.min, self.max
            )));
        }
        self.ensure_in_range(self.baseline)
    }

    /// Saturating adjustment: the result is clamped into the bounds.
    #[must_use]
    pub fn adjusted(&self, old_score: f64, delta: f64) -> f64 {
        (old_score + delta).clamp(self.min, self.max)
    }

    /// Delta for a settled share, positive when paid on time.
    #[must_use]
    pub fn settlement_delta(&self, on_time: bool) -> f64 {
        if on_time {
            self.on_time_delta
        } else {
            -self.late_delta
        }
    }

    /// Rejects explicit writes outside the bounds instead of clamping them.
    pub fn ensure_in_range(&self, score: f64) -> ResultEngine<()> {
        if !score.is_finite() || score < self.min || score > self.max {
            return Err(EngineError::InvalidScoreRange(format!(
                "score must be between {} and {}, got {score}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// What a score entry was written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreEntryKind {
    Initial,
    Adjustment,
    Override,
}

impl ScoreEntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Adjustment => "adjustment",
            Self::Override => "override",
        }
    }
}

impl TryFrom<&str> for ScoreEntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "initial" => Ok(Self::Initial),
            "adjustment" => Ok(Self::Adjustment),
            "override" => Ok(Self::Override),
            other => Err(EngineError::InvalidScoreRange(format!(
                "invalid score entry kind: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_saturates_at_bounds() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.adjusted(98.0, 5.0), 100.0);
        assert_eq!(policy.adjusted(3.0, -10.0), 0.0);
        assert_eq!(policy.adjusted(50.0, 5.0), 55.0);
    }

    #[test]
    fn override_range_is_strict() {
        let policy = ScorePolicy::default();
        assert!(policy.ensure_in_range(100.0).is_ok());
        assert!(matches!(
            policy.ensure_in_range(100.5),
            Err(EngineError::InvalidScoreRange(_))
        ));
        assert!(policy.ensure_in_range(f64::NAN).is_err());
    }

    #[test]
    fn late_settlement_is_negative() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.settlement_delta(true), 5.0);
        assert_eq!(policy.settlement_delta(false), -10.0);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let policy = ScorePolicy {
            min: 10.0,
            max: 5.0,
            ..ScorePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn rejects_bounds_outside_zero_to_hundred() {
        let wide = ScorePolicy {
            min: -20.0,
            max: 300.0,
            ..ScorePolicy::default()
        };
        assert!(matches!(
            wide.validate(),
            Err(EngineError::InvalidScoreRange(_))
        ));
        let narrow = ScorePolicy {
            min: 10.0,
            max: 90.0,
            ..ScorePolicy::default()
        };
        assert!(narrow.validate().is_ok());
    }
}
