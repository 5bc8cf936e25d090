//! Recurrence rules for reminders and recurring transactions.
//!
//! A [`RecurrenceRule`] is a pure description of how an item repeats:
//! frequency, interval, an optional day-of-month anchor and an optional end
//! date. [`RecurrenceRule::next_date`] never touches the database, so the
//! date-rolling logic is testable on its own.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidRecurrence(format!(
                "invalid frequency: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Advance by this many periods per occurrence (>= 1).
    pub interval: u32,
    /// Monthly anchor: clamped to the last valid day of shorter months.
    pub day_of_month: Option<u32>,
    /// Last date an occurrence may fall on. A computed date strictly after
    /// this ends the series.
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn validate(&self) -> ResultEngine<()> {
        if self.interval == 0 {
            return Err(EngineError::InvalidRecurrence(
                "interval must be at least 1".to_string(),
            ));
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(EngineError::InvalidRecurrence(
                    "day_of_month must be between 1 and 31".to_string(),
                ));
            }
            if self.frequency != Frequency::Monthly {
                return Err(EngineError::InvalidRecurrence(
                    "day_of_month only applies to monthly recurrence".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Computes the date of the occurrence following `current`.
    ///
    /// Returns `None` once the computed date falls strictly after
    /// `end_date`.
    pub fn next_date(&self, current: NaiveDate) -> Option<NaiveDate> {
        let interval = i64::from(self.interval);
        let next = match self.frequency {
            Frequency::Daily => current + Duration::days(interval),
            Frequency::Weekly => current + Duration::weeks(interval),
            Frequency::Monthly => {
                let shifted = add_months(current, self.interval);
                match self.day_of_month {
                    Some(day) => clamp_to_month(shifted.year(), shifted.month(), day),
                    None => shifted,
                }
            }
            Frequency::Yearly => add_months(current, self.interval * 12),
        };

        match self.end_date {
            Some(end) if next > end => None,
            _ => Some(next),
        }
    }

    /// Computes the timestamp of the occurrence following `current`,
    /// preserving the time of day.
    pub fn next_occurrence(&self, current: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = self.next_date(current.date_naive())?;
        Some(next.and_time(current.time()).and_utc())
    }
}

/// Advances a date by whole calendar months, clamping the day to the last
/// valid day of the target month (Jan 31 + 1 month = Feb 28/29).
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    clamp_to_month(year, month, date.day())
}

fn clamp_to_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let last = days_in_month(year, month);
    // Month and the clamped day are valid by construction; the fallback is
    // unreachable for in-range years.
    NaiveDate::from_ymd_opt(year, month, day.min(last)).unwrap_or(NaiveDate::MIN)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

impl RecurrenceRule {
    /// Rebuilds an optional rule from its flattened entity columns.
    pub fn from_columns(
        frequency: Option<&str>,
        interval: Option<i32>,
        day_of_month: Option<i32>,
        end_date: Option<NaiveDate>,
    ) -> ResultEngine<Option<RecurrenceRule>> {
        let Some(frequency) = frequency else {
            return Ok(None);
        };
        let rule = RecurrenceRule {
            frequency: Frequency::try_from(frequency)?,
            interval: interval.unwrap_or(1).max(1) as u32,
            day_of_month: day_of_month.map(|d| d as u32),
            end_date,
        };
        rule.validate()?;
        Ok(Some(rule))
    }

    /// Flattens an optional rule into its entity columns.
    pub fn to_columns(
        rule: Option<&RecurrenceRule>,
    ) -> (
        Option<String>,
        Option<i32>,
        Option<i32>,
        Option<NaiveDate>,
    ) {
        match rule {
            Some(rule) => (
                Some(rule.frequency.as_str().to_string()),
                Some(rule.interval as i32),
                rule.day_of_month.map(|d| d as i32),
                rule.end_date,
            ),
            None => (None, None, None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_advances_by_interval() {
        let rule = RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 2,
            day_of_month: None,
            end_date: None,
        };
        assert_eq!(rule.next_date(date(2025, 1, 6)), Some(date(2025, 1, 20)));
    }

    #[test]
    fn monthly_anchor_clamps_to_short_months() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 1,
            day_of_month: Some(31),
            end_date: None,
        };
        assert_eq!(rule.next_date(date(2025, 1, 31)), Some(date(2025, 2, 28)));
        assert_eq!(rule.next_date(date(2025, 2, 28)), Some(date(2025, 3, 31)));
        // Leap year February keeps the extra day.
        assert_eq!(rule.next_date(date(2024, 1, 31)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn monthly_without_anchor_keeps_current_day() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 3,
            day_of_month: None,
            end_date: None,
        };
        assert_eq!(rule.next_date(date(2025, 1, 15)), Some(date(2025, 4, 15)));
        assert_eq!(rule.next_date(date(2025, 11, 30)), Some(date(2026, 2, 28)));
    }

    #[test]
    fn end_date_is_exclusive_safe() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 1,
            day_of_month: Some(31),
            end_date: Some(date(2025, 2, 28)),
        };
        // Lands exactly on the end date: still produced.
        assert_eq!(rule.next_date(date(2025, 1, 31)), Some(date(2025, 2, 28)));
        // One month later would be Mar 31 > end date: series over.
        assert_eq!(rule.next_date(date(2025, 2, 28)), None);
    }

    #[test]
    fn yearly_handles_leap_day() {
        let rule = RecurrenceRule {
            frequency: Frequency::Yearly,
            interval: 1,
            day_of_month: None,
            end_date: None,
        };
        assert_eq!(rule.next_date(date(2024, 2, 29)), Some(date(2025, 2, 28)));
    }

    #[test]
    fn next_occurrence_preserves_time_of_day() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 10,
            day_of_month: None,
            end_date: None,
        };
        let current = date(2025, 3, 1).and_hms_opt(9, 30, 0).unwrap().and_utc();
        let next = rule.next_occurrence(current).unwrap();
        assert_eq!(next.date_naive(), date(2025, 3, 11));
        assert_eq!(next.time(), current.time());
    }

    #[test]
    fn validate_rejects_bad_rules() {
        let mut rule = RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 0,
            day_of_month: None,
            end_date: None,
        };
        assert!(rule.validate().is_err());

        rule.interval = 1;
        rule.day_of_month = Some(15);
        // day_of_month on a non-monthly rule is meaningless.
        assert!(rule.validate().is_err());

        rule.frequency = Frequency::Monthly;
        assert!(rule.validate().is_ok());

        rule.day_of_month = Some(32);
        assert!(rule.validate().is_err());
    }
}
