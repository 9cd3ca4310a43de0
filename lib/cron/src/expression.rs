//! Validated cron expressions with UTC next-occurrence computation.

use crate::error::CronError;
use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;

/// How far ahead of the reference instant an occurrence is searched for.
///
/// Expressions that never fire within this window (e.g. `0 0 0 30 2 *`,
/// February 30th) are reported as having no upcoming occurrence instead of
/// iterating forever.
const HORIZON_DAYS: i64 = 3_653; // ~10 years

/// A validated cron expression.
///
/// Accepts standard five-field expressions (minute, hour, day-of-month,
/// month, day-of-week) as well as six/seven-field variants with an explicit
/// seconds (and optional year) field. Five-field input is normalized by
/// prepending `0` for seconds, so `0 9 * * *` fires at 09:00:00 UTC daily.
/// Numeric day-of-week follows the standard convention: 0 is Sunday
/// through 6 is Saturday, with 7 also accepted as Sunday.
#[derive(Debug, Clone)]
pub struct CronExpression {
    source: String,
    schedule: Schedule,
}

impl CronExpression {
    /// Parses and validates a cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`CronError::Malformed`] if the expression has the wrong
    /// number of fields or any field fails to parse.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let (needs_seconds, dow_index) = match fields.len() {
            5 => (true, 4),
            6 | 7 => (false, 5),
            n => {
                return Err(CronError::Malformed {
                    expression: expression.to_string(),
                    reason: format!("expected 5, 6, or 7 fields, got {n}"),
                });
            }
        };

        let mut normalized: Vec<String> = Vec::with_capacity(fields.len() + 1);
        if needs_seconds {
            normalized.push("0".to_string());
        }
        for (i, field) in fields.iter().enumerate() {
            if i == dow_index {
                normalized.push(translate_day_of_week(field));
            } else {
                normalized.push((*field).to_string());
            }
        }
        let normalized = normalized.join(" ");

        let schedule = Schedule::from_str(&normalized).map_err(|e| CronError::Malformed {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: expression.to_string(),
            schedule,
        })
    }

    /// Computes the next occurrence strictly after the given instant, in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`CronError::NoUpcomingOccurrence`] if the expression never
    /// fires within the evaluation horizon after `after`.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        let horizon = after + Duration::days(HORIZON_DAYS);
        match self.schedule.after(&after).next() {
            Some(next) if next <= horizon => Ok(next),
            _ => Err(CronError::NoUpcomingOccurrence {
                expression: self.source.clone(),
            }),
        }
    }

    /// Returns the expression as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Shifts numeric day-of-week tokens from the standard 0-6 Sunday-first
/// numbering (7 also meaning Sunday) to the underlying parser's 1-7.
/// Names and wildcards pass through; anything unrecognized is left for the
/// parser to reject.
fn translate_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(translate_dow_token)
        .collect::<Vec<_>>()
        .join(",")
}

fn translate_dow_token(token: &str) -> String {
    let (range, step) = match token.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (token, None),
    };

    let translated = match range.split_once('-') {
        Some((start, end)) => match (shift_dow(start), shift_dow(end)) {
            // A shifted range that wraps through Sunday (e.g. 5-7, Friday
            // to Sunday) must be split into two pieces.
            (Some(start), Some(end)) if start > end && step.is_none() => {
                return if end == 1 {
                    format!("{start}-7,1")
                } else {
                    format!("{start}-7,1-{end}")
                };
            }
            (Some(start), Some(end)) => format!("{start}-{end}"),
            _ => range.to_string(),
        },
        None => match shift_dow(range) {
            Some(n) => n.to_string(),
            None => range.to_string(),
        },
    };

    match step {
        Some(step) => format!("{translated}/{step}"),
        None => translated,
    }
}

fn shift_dow(token: &str) -> Option<u8> {
    let n: u8 = token.parse().ok()?;
    match n {
        7 => Some(1),
        0..=6 => Some(n + 1),
        // Out of range; the parser reports it.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn five_field_expression_is_normalized() {
        let expr = CronExpression::parse("0 9 * * *").expect("should parse");
        let next = expr.next_occurrence(utc(2025, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 1, 9, 0, 0));
    }

    #[test]
    fn next_occurrence_is_strictly_after_reference() {
        let expr = CronExpression::parse("0 9 * * *").unwrap();
        // Reference exactly at an occurrence: the result must be the next one.
        let next = expr.next_occurrence(utc(2025, 1, 1, 9, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 2, 9, 0, 0));
    }

    #[test]
    fn six_field_expression_with_seconds() {
        let expr = CronExpression::parse("30 15 8 * * *").unwrap();
        let next = expr.next_occurrence(utc(2025, 6, 1, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 6, 2, 8, 15, 30));
    }

    #[test]
    fn step_and_range_fields() {
        let expr = CronExpression::parse("*/15 * * * *").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 1, 10, 7, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 1, 10, 15, 0));

        let expr = CronExpression::parse("0 9-17 * * 1-5").unwrap();
        // Saturday 2025-01-04 rolls over to Monday 2025-01-06.
        let next = expr.next_occurrence(utc(2025, 1, 4, 0, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 6, 9, 0, 0));
    }

    #[test]
    fn numeric_day_of_week_counts_from_sunday() {
        // 2025-01-04 is a Saturday; dow 0 is the next day, Sunday.
        let expr = CronExpression::parse("0 9 * * 0").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 4, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 5, 9, 0, 0));

        // 7 is Sunday as well.
        let expr = CronExpression::parse("0 9 * * 7").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 4, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 5, 9, 0, 0));

        // Monday is 1, never Sunday.
        let expr = CronExpression::parse("0 9 * * 1").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 4, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 6, 9, 0, 0));
    }

    #[test]
    fn day_of_week_lists_are_translated() {
        // Mon/Wed/Fri; after Sunday 2025-01-05 the next is Monday.
        let expr = CronExpression::parse("0 9 * * 1,3,5").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 5, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 6, 9, 0, 0));
    }

    #[test]
    fn day_of_week_range_wrapping_sunday() {
        // 5-7 is Friday through Sunday; after Wednesday 2025-01-01 the
        // next is Friday, and Sunday 2025-01-05 is included too.
        let expr = CronExpression::parse("0 9 * * 5-7").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 1, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 3, 9, 0, 0));

        let next = expr.next_occurrence(utc(2025, 1, 4, 12, 0, 0)).unwrap();
        assert_eq!(next, utc(2025, 1, 5, 9, 0, 0));
    }

    #[test]
    fn six_field_day_of_week_uses_same_numbering() {
        let expr = CronExpression::parse("0 0 12 * * 1").unwrap();
        let next = expr.next_occurrence(utc(2025, 1, 1, 0, 0, 0)).unwrap();
        // Next Monday after Wednesday 2025-01-01.
        assert_eq!(next, utc(2025, 1, 6, 12, 0, 0));
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = CronExpression::parse("0 9 *").unwrap_err();
        assert!(matches!(err, CronError::Malformed { .. }));

        let err = CronExpression::parse("").unwrap_err();
        assert!(matches!(err, CronError::Malformed { .. }));
    }

    #[test]
    fn garbage_fields_are_malformed() {
        let err = CronExpression::parse("0 9 * * banana").unwrap_err();
        assert!(matches!(err, CronError::Malformed { .. }));
    }

    #[test]
    fn impossible_date_has_no_occurrence() {
        // February 30th never exists.
        let expr = CronExpression::parse("0 0 0 30 2 *").unwrap();
        let err = expr.next_occurrence(utc(2025, 1, 1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, CronError::NoUpcomingOccurrence { .. }));
    }

    #[test]
    fn source_is_preserved() {
        let expr = CronExpression::parse("0 9 * * *").unwrap();
        assert_eq!(expr.as_str(), "0 9 * * *");
        assert_eq!(expr.to_string(), "0 9 * * *");
    }
}
