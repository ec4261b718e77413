//! Wall-clock reset rules.
//!
//! A rule such as `day/4:00` or `week/1/9:30` names the local time at which
//! a timer is reset regardless of activity. Weekdays count from 0 (Sunday).

use super::error::PredicateError;
use chrono::{Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Weekday};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPredicate {
    Daily { time: NaiveTime },
    Weekly { weekday: Weekday, time: NaiveTime },
}

impl ResetPredicate {
    /// First matching instant strictly after `last_secs`, in epoch seconds.
    pub fn next_after(&self, last_secs: i64, offset: FixedOffset) -> i64 {
        let Some(last) = offset.timestamp_opt(last_secs, 0).single() else {
            return last_secs + Duration::days(1).num_seconds();
        };

        let (time, step) = match self {
            ResetPredicate::Daily { time } => (*time, Duration::days(1)),
            ResetPredicate::Weekly { time, .. } => (*time, Duration::weeks(1)),
        };

        let mut date = last.date_naive();
        if let ResetPredicate::Weekly { weekday, .. } = self {
            let ahead = (weekday.num_days_from_sunday() + 7 - date.weekday().num_days_from_sunday()) % 7;
            date = date + Duration::days(ahead as i64);
        }

        let mut candidate = match offset.from_local_datetime(&date.and_time(time)).single() {
            Some(candidate) => candidate,
            None => return last_secs + step.num_seconds(),
        };
        while candidate <= last {
            candidate = candidate + step;
        }
        candidate.timestamp()
    }
}

fn parse_time(text: &str) -> Result<NaiveTime, PredicateError> {
    let (hours, minutes) = text.split_once(':').ok_or_else(|| PredicateError::InvalidTime(text.to_string()))?;
    let hours: u32 = hours.trim().parse().map_err(|_| PredicateError::InvalidTime(text.to_string()))?;
    let minutes: u32 = minutes.trim().parse().map_err(|_| PredicateError::InvalidTime(text.to_string()))?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(|| PredicateError::InvalidTime(text.to_string()))
}

fn parse_weekday(text: &str) -> Result<Weekday, PredicateError> {
    let day: u8 = text.trim().parse().map_err(|_| PredicateError::InvalidWeekday(text.to_string()))?;
    match day {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(PredicateError::InvalidWeekday(text.to_string())),
    }
}

impl FromStr for ResetPredicate {
    type Err = PredicateError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = text.trim().split('/').collect();
        match parts.as_slice() {
            ["day", time] => Ok(ResetPredicate::Daily { time: parse_time(time)? }),
            ["week", weekday, time] => Ok(ResetPredicate::Weekly {
                weekday: parse_weekday(weekday)?,
                time: parse_time(time)?,
            }),
            ["day", ..] | ["week", ..] => Err(PredicateError::WrongArity(text.to_string())),
            [kind, ..] => Err(PredicateError::UnknownKind(kind.to_string())),
            [] => Err(PredicateError::UnknownKind(String::new())),
        }
    }
}

impl fmt::Display for ResetPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetPredicate::Daily { time } => write!(f, "day/{}", time.format("%-H:%M")),
            ResetPredicate::Weekly { weekday, time } => {
                write!(f, "week/{}/{}", weekday.num_days_from_sunday(), time.format("%-H:%M"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn epoch(text: &str) -> i64 {
        DateTime::parse_from_rfc3339(text).unwrap().timestamp()
    }

    #[test]
    fn parses_daily_and_weekly_rules() {
        assert_eq!(
            "day/4:00".parse::<ResetPredicate>().unwrap(),
            ResetPredicate::Daily {
                time: NaiveTime::from_hms_opt(4, 0, 0).unwrap()
            }
        );
        assert_eq!(
            "week/1/09:30".parse::<ResetPredicate>().unwrap(),
            ResetPredicate::Weekly {
                weekday: Weekday::Mon,
                time: NaiveTime::from_hms_opt(9, 30, 0).unwrap()
            }
        );
        assert_eq!("day/4:00".parse::<ResetPredicate>().unwrap().to_string(), "day/4:00");
    }

    #[test]
    fn rejects_malformed_rules() {
        assert!(matches!("hour/4:00".parse::<ResetPredicate>(), Err(PredicateError::UnknownKind(_))));
        assert!(matches!("day/25:00".parse::<ResetPredicate>(), Err(PredicateError::InvalidTime(_))));
        assert!(matches!("week/7/4:00".parse::<ResetPredicate>(), Err(PredicateError::InvalidWeekday(_))));
        assert!(matches!("day".parse::<ResetPredicate>(), Err(PredicateError::WrongArity(_))));
        assert!("".parse::<ResetPredicate>().is_err());
    }

    #[test]
    fn daily_rule_picks_next_boundary() {
        let rule: ResetPredicate = "day/4:00".parse().unwrap();
        assert_eq!(rule.next_after(epoch("2024-03-10T03:59:00Z"), utc()), epoch("2024-03-10T04:00:00Z"));
        assert_eq!(rule.next_after(epoch("2024-03-10T04:00:00Z"), utc()), epoch("2024-03-11T04:00:00Z"));
        assert_eq!(rule.next_after(epoch("2024-03-10T12:00:00Z"), utc()), epoch("2024-03-11T04:00:00Z"));
    }

    #[test]
    fn weekly_rule_picks_next_weekday() {
        // 2024-03-10 is a Sunday.
        let rule: ResetPredicate = "week/1/8:00".parse().unwrap();
        assert_eq!(rule.next_after(epoch("2024-03-10T12:00:00Z"), utc()), epoch("2024-03-11T08:00:00Z"));
        assert_eq!(rule.next_after(epoch("2024-03-11T08:00:00Z"), utc()), epoch("2024-03-18T08:00:00Z"));
    }

    #[test]
    fn honours_local_offset() {
        let rule: ResetPredicate = "day/4:00".parse().unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(rule.next_after(epoch("2024-03-10T00:00:00Z"), plus_two), epoch("2024-03-10T02:00:00Z"));
    }
}
