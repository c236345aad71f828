use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};

use crate::ApiError;

/// A closed time range sent as the `start`/`end` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self, ApiError> {
        if end <= start {
            return Err(ApiError::InvalidArgument(format!(
                "window end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Local midnight to 23:59:59.999 of `date` in `tz`.
    pub fn day_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let start = resolve_local(tz, date.and_time(NaiveTime::MIN));
        let end = resolve_local(tz, date.and_time(NaiveTime::MIN) + Duration::days(1))
            - Duration::milliseconds(1);
        Self { start, end }
    }

    /// The day window in the browser's (or host's) local time zone.
    pub fn local_day(date: NaiveDate) -> Self {
        Self::day_in(date, &Local)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn start_param(&self) -> String {
        iso_utc(&self.start)
    }

    pub fn end_param(&self) -> String {
        iso_utc(&self.end)
    }
}

/// Maps a local wall-clock time to an instant, taking the earlier reading on
/// DST overlaps and treating times inside a DST gap as UTC.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive).fixed_offset())
}

fn iso_utc(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Cache key form of a date: `YYYY-MM-DD`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()
}

/// Calendar day of `dt` as seen in `tz`.
pub fn local_day<Tz: TimeZone>(dt: &DateTime<FixedOffset>, tz: &Tz) -> NaiveDate {
    dt.with_timezone(tz).date_naive()
}

/// `date` shifted by whole days; `None` only at the ends of the calendar.
pub fn shift_days(date: NaiveDate, offset: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_window_covers_local_day() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let window = TimeWindow::day_in(date(2024, 5, 6), &tz);

        assert_eq!(window.start_param(), "2024-05-05T22:00:00.000Z");
        assert_eq!(window.end_param(), "2024-05-06T21:59:59.999Z");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let start = DateTime::parse_from_rfc3339("2024-05-06T10:00:00Z").unwrap();
        let end = DateTime::parse_from_rfc3339("2024-05-06T09:00:00Z").unwrap();
        assert!(matches!(
            TimeWindow::new(start, end),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(TimeWindow::new(end, start).is_ok());
    }

    #[test]
    fn day_keys_ignore_time_of_day() {
        let late = DateTime::parse_from_rfc3339("2024-05-06T23:30:00+02:00").unwrap();
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();

        assert_eq!(day_key(local_day(&late, &tz)), "2024-05-06");
        assert_eq!(day_key(local_day(&late, &Utc)), "2024-05-06");
        assert_eq!(parse_day_key(" 2024-05-06 "), Some(date(2024, 5, 6)));
        assert_eq!(parse_day_key("06.05.2024"), None);
    }

    #[test]
    fn shifting_crosses_month_boundaries() {
        assert_eq!(shift_days(date(2024, 3, 1), -1), Some(date(2024, 2, 29)));
        assert_eq!(shift_days(date(2024, 12, 31), 2), Some(date(2025, 1, 2)));
    }
}
