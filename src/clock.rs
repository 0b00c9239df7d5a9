use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Format of every human-facing timestamp (`YYYY-MM-DD HH:MM:SS`, local time).
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

pub fn display_now() -> String {
    format_display(&Local::now())
}

pub fn format_display<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format(DISPLAY_FORMAT).to_string()
}

pub fn parse_display(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DISPLAY_FORMAT).ok()
}

/// Nanoseconds since the epoch, used to build sortable log ids.
pub fn unix_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
