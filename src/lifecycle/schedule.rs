//! Recurring weekly schedule anchor.
//!
//! While the domain is quiet, probing is anchored to a well-known weekly
//! schedule point (e.g. "the matchmaking window opens Tuesday 18:00 UTC")
//! instead of polling blindly.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use thiserror::Error;

/// Errors from parsing a schedule spec. Fatal at construction time.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Spec did not have the `<weekday> <HH:MM>` shape.
    #[error("schedule spec must be '<weekday> <HH:MM>', got '{0}'")]
    Malformed(String),

    /// The weekday token was not recognized.
    #[error("unrecognized weekday in schedule spec: '{0}'")]
    UnknownWeekday(String),

    /// The time-of-day token was not a valid `HH:MM`.
    #[error("invalid time of day in schedule spec: '{0}'")]
    InvalidTime(String),
}

/// A weekly recurring point in time (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringAnchor {
    /// Day of week the anchor falls on.
    pub weekday: Weekday,
    /// Time of day (UTC) the anchor falls at.
    pub time: NaiveTime,
}

impl RecurringAnchor {
    /// Create an anchor from parts.
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// Parse a spec such as `"tue 18:00"` or `"Friday 09:30"`.
    pub fn from_spec(spec: &str) -> Result<Self, ScheduleError> {
        let mut parts = spec.split_whitespace();
        let (day, time) = match (parts.next(), parts.next(), parts.next()) {
            (Some(day), Some(time), None) => (day, time),
            _ => return Err(ScheduleError::Malformed(spec.to_string())),
        };
        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| ScheduleError::UnknownWeekday(day.to_string()))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| ScheduleError::InvalidTime(time.to_string()))?;
        Ok(Self { weekday, time })
    }

    /// The next occurrence of this anchor at or strictly after `now`.
    ///
    /// If `now` is already at or past the anchor instant this week, the
    /// occurrence rolls to next week.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let days_ahead = (self.weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let date = today + Duration::days(days_ahead);
        let mut occurrence = date.and_time(self.time).and_utc();
        if occurrence <= now {
            occurrence += Duration::days(7);
        }
        occurrence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> RecurringAnchor {
        RecurringAnchor::from_spec("tue 18:00").unwrap()
    }

    #[test]
    fn parses_short_and_long_weekday_names() {
        let a = RecurringAnchor::from_spec("tue 18:00").unwrap();
        assert_eq!(a.weekday, Weekday::Tue);
        assert_eq!(a.time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());

        let b = RecurringAnchor::from_spec("Friday 09:30").unwrap();
        assert_eq!(b.weekday, Weekday::Fri);
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(matches!(
            RecurringAnchor::from_spec("tuesday"),
            Err(ScheduleError::Malformed(_))
        ));
        assert!(matches!(
            RecurringAnchor::from_spec("tue 18:00 extra"),
            Err(ScheduleError::Malformed(_))
        ));
        assert!(matches!(
            RecurringAnchor::from_spec("someday 18:00"),
            Err(ScheduleError::UnknownWeekday(_))
        ));
        assert!(matches!(
            RecurringAnchor::from_spec("tue 25:99"),
            Err(ScheduleError::InvalidTime(_))
        ));
    }

    #[test]
    fn next_occurrence_from_every_day_of_the_week() {
        // 2026-08-25 is a Tuesday.
        let expected: DateTime<Utc> = "2026-08-25T18:00:00Z".parse().unwrap();

        for day_offset in 0..7 {
            let now: DateTime<Utc> = "2026-08-19T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
                + Duration::days(day_offset);
            let next = anchor().next_occurrence(now);
            assert_eq!(next.weekday(), Weekday::Tue);
            assert_eq!(next.time(), anchor().time);
            assert!(next > now);
            // Wednesday through Tuesday-morning all resolve to the same Tuesday.
            if now < expected {
                assert_eq!(next, expected);
            }
        }
    }

    #[test]
    fn rolls_to_next_week_at_or_after_the_anchor_instant() {
        let this_week: DateTime<Utc> = "2026-08-25T18:00:00Z".parse().unwrap();
        let next_week = this_week + Duration::days(7);

        // One second before the anchor: still this week.
        assert_eq!(
            anchor().next_occurrence(this_week - Duration::seconds(1)),
            this_week
        );
        // Exactly at the anchor: rolls over.
        assert_eq!(anchor().next_occurrence(this_week), next_week);
        // One second after: rolls over.
        assert_eq!(
            anchor().next_occurrence(this_week + Duration::seconds(1)),
            next_week
        );
    }
}
