//! Calendar periods used by interest accrual and reminders.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A calendar step.
///
/// `Daily`, `Weekly` and `Biweekly` are fixed-length; `Monthly` follows the
/// calendar (clamped to the last day of shorter months).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }

    fn fixed_length(self) -> Option<Duration> {
        match self {
            Self::Daily => Some(Duration::days(1)),
            Self::Weekly => Some(Duration::weeks(1)),
            Self::Biweekly => Some(Duration::weeks(2)),
            Self::Monthly => None,
        }
    }

    /// Moves `from` forward by one period.
    pub fn advance(self, from: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
        let next = match self.fixed_length() {
            Some(step) => from.checked_add_signed(step),
            None => from.checked_add_months(Months::new(1)),
        };
        next.ok_or_else(|| EngineError::InvalidAmount("date out of range".to_string()))
    }

    /// Counts the whole periods between `from` and `to`.
    ///
    /// Returns the count and the boundary reached after stepping that many
    /// periods from `from`, so callers can keep the fractional tail for the
    /// next run.
    pub fn whole_periods_between(
        self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<(i64, DateTime<Utc>)> {
        if to <= from {
            return Ok((0, from));
        }
        match self.fixed_length() {
            Some(step) => {
                let count = (to - from).num_seconds() / step.num_seconds();
                let boundary = from
                    .checked_add_signed(step * i32::try_from(count).map_err(|_| {
                        EngineError::InvalidAmount("accrual window too large".to_string())
                    })?)
                    .ok_or_else(|| EngineError::InvalidAmount("date out of range".to_string()))?;
                Ok((count, boundary))
            }
            None => {
                let mut count = 0;
                let mut boundary = from;
                loop {
                    let next = self.advance(boundary)?;
                    if next > to {
                        break;
                    }
                    boundary = next;
                    count += 1;
                }
                Ok((count, boundary))
            }
        }
    }
}

impl TryFrom<&str> for Period {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidAmount(format!("invalid period: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn daily_periods_drop_partial_day() {
        let from = day(2026, 1, 1);
        let to = day(2026, 1, 11) + Duration::hours(5);
        let (count, boundary) = Period::Daily.whole_periods_between(from, to).unwrap();
        assert_eq!(count, 10);
        assert_eq!(boundary, day(2026, 1, 11));
    }

    #[test]
    fn monthly_periods_follow_calendar() {
        let (count, boundary) = Period::Monthly
            .whole_periods_between(day(2026, 1, 31), day(2026, 4, 30))
            .unwrap();
        // Jan 31 -> Feb 28 -> Mar 28 -> Apr 28
        assert_eq!(count, 3);
        assert_eq!(boundary, day(2026, 4, 28));
    }

    #[test]
    fn no_periods_when_window_is_empty() {
        let at = day(2026, 1, 1);
        assert_eq!(Period::Weekly.whole_periods_between(at, at).unwrap(), (0, at));
    }
}
