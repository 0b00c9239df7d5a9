use crate::clock;
use chrono::{DateTime, Local};
use croner::Cron;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("cron expression is empty")]
    Empty,
    #[error("invalid cron expression: expected 5 or 6 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid cron expression '{expr}': {reason}")]
    Invalid { expr: String, reason: String },
    #[error("no upcoming run for cron expression '{0}'")]
    NoNextRun(String),
}

/// A parsed cron expression. Five fields are minute-resolution; six fields
/// carry a leading seconds field.
#[derive(Debug, Clone)]
pub struct CronSpec {
    expr: String,
    cron: Cron,
}

impl CronSpec {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let expr = expr.trim();
        let field_count = expr.split_whitespace().count();
        match field_count {
            0 => return Err(CronError::Empty),
            5 | 6 => {}
            n => return Err(CronError::FieldCount(n)),
        }
        let cron = Cron::new(expr)
            .with_seconds_optional()
            .parse()
            .map_err(|e| CronError::Invalid {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            expr: expr.to_string(),
            cron,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First matching instant strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Local>) -> Result<DateTime<Local>, CronError> {
        self.cron
            .find_next_occurrence(after, false)
            .map_err(|_| CronError::NoNextRun(self.expr.clone()))
    }

    pub fn next_run_display(&self) -> Result<String, CronError> {
        self.next_after(&Local::now())
            .map(|next| clock::format_display(&next))
    }

    pub fn describe(&self) -> String {
        describe_cron_expr(&self.expr)
    }
}

/// Short English description of common cron shapes. Anything unusual is
/// echoed back unchanged.
pub fn describe_cron_expr(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let (second, minute, hour, day, month, weekday) = match fields.as_slice() {
        [s, m, h, d, mo, w] => (*s, *m, *h, *d, *mo, *w),
        [m, h, d, mo, w] => ("0", *m, *h, *d, *mo, *w),
        _ => return expr.to_string(),
    };
    let whole_minute = second == "0" || second == "*";

    if minute == "*" && hour == "*" && day == "*" && month == "*" && weekday == "*" {
        if whole_minute {
            return "every minute".to_string();
        }
        return format!("every minute at second {}", second);
    }

    if hour == "*" && day == "*" && month == "*" && weekday == "*" {
        if minute == "0" {
            return "every hour on the hour".to_string();
        }
        if let Some(interval) = minute.strip_prefix("*/") {
            return format!("every {} minutes", interval);
        }
        return format!("every hour at minute {}", minute);
    }

    if day == "*" && month == "*" && weekday == "*" {
        if minute == "0" && whole_minute {
            if let Some(interval) = hour.strip_prefix("*/") {
                return format!("every {} hours", interval);
            }
            return format!("every day at {} o'clock", hour);
        }
        if whole_minute {
            return format!("every day at {}:{}", hour, minute);
        }
        return format!("every day at {}:{}:{}", hour, minute, second);
    }

    if month == "*" && weekday != "*" {
        let days = match weekday {
            "1-5" => "weekdays".to_string(),
            "6,0" | "0,6" => "weekends".to_string(),
            other => format!("every week on {}", other),
        };
        if minute == "0" {
            return format!("{} at {} o'clock", days, hour);
        }
        return format!("{} at {}:{}", days, hour, minute);
    }

    expr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn rejects_wrong_field_counts() {
        let err = CronSpec::parse("* * *").unwrap_err();
        assert_eq!(err, CronError::FieldCount(3));
        assert!(err.to_string().contains("expected 5 or 6 fields, got 3"));
        assert_eq!(
            CronSpec::parse("* * * * * * *").unwrap_err(),
            CronError::FieldCount(7)
        );
        assert_eq!(CronSpec::parse("  ").unwrap_err(), CronError::Empty);
    }

    #[test]
    fn rejects_bad_field_values() {
        assert!(matches!(
            CronSpec::parse("61 * * * *"),
            Err(CronError::Invalid { .. })
        ));
    }

    #[test]
    fn five_fields_fire_on_the_minute() {
        let spec = CronSpec::parse("*/15 * * * *").unwrap();
        let start = Local.with_ymd_and_hms(2024, 3, 1, 10, 7, 30).unwrap();
        let next = spec.next_after(&start).unwrap();
        assert_eq!((next.hour(), next.minute(), next.second()), (10, 15, 0));
    }

    #[test]
    fn six_fields_use_leading_seconds() {
        let spec = CronSpec::parse("30 * * * * *").unwrap();
        let start = Local.with_ymd_and_hms(2024, 3, 1, 10, 7, 0).unwrap();
        let next = spec.next_after(&start).unwrap();
        assert_eq!((next.minute(), next.second()), (7, 30));
    }

    #[test]
    fn zero_seconds_field_matches_five_field_form() {
        let five = CronSpec::parse("0 3 * * *").unwrap();
        let six = CronSpec::parse("0 0 3 * * *").unwrap();
        let start = Local.with_ymd_and_hms(2024, 3, 1, 10, 7, 30).unwrap();

        let expected = Local.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        assert_eq!(five.next_after(&start).unwrap(), expected);
        assert_eq!(six.next_after(&start).unwrap(), expected);
    }

    #[test]
    fn next_run_is_strictly_after() {
        let spec = CronSpec::parse("0 12 * * *").unwrap();
        let noon = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let next = spec.next_after(&noon).unwrap();
        assert!(next > noon);
        assert_eq!(next.hour(), 12);
    }

    #[test]
    fn describes_common_shapes() {
        let cases = [
            ("* * * * *", "every minute"),
            ("15 * * * * *", "every minute at second 15"),
            ("0 * * * *", "every hour on the hour"),
            ("*/5 * * * *", "every 5 minutes"),
            ("30 * * * *", "every hour at minute 30"),
            ("0 */2 * * *", "every 2 hours"),
            ("0 9 * * *", "every day at 9 o'clock"),
            ("30 9 * * *", "every day at 9:30"),
            ("10 30 9 * * *", "every day at 9:30:10"),
            ("0 9 * * 1-5", "weekdays at 9 o'clock"),
            ("30 10 * * 6,0", "weekends at 10:30"),
            ("0 8 * * 0,6", "weekends at 8 o'clock"),
            ("15 8 * * 3", "every week on 3 at 8:15"),
            ("0 0 1 * *", "0 0 1 * *"),
            ("bogus", "bogus"),
        ];
        for (expr, expected) in cases {
            assert_eq!(describe_cron_expr(expr), expected, "expr: {}", expr);
        }
    }
}
