//! Business-day windows for server-side list queries.
//!
//! A calendar date is mapped to the UTC instants of 00:00:00 and 23:59:59 local
//! time in a reference timezone. The offset is looked up at the naive UTC
//! reading of the wall-clock time and then subtracted, so the result follows
//! the zone's daylight-saving rules for that particular date.

use jiff::tz::TimeZone;
use time::{
    macros::{format_description, time},
    Date, PrimitiveDateTime, Time,
};

pub const DEFAULT_REFERENCE_TIMEZONE: &str = "Europe/Bucharest";

const END_OF_DAY: Time = time!(23:59:59);

/// Start and end of a local calendar day, as UNIX seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn for_date(date: Date, zone: &TimeZone) -> Self {
        Self {
            start: local_to_unix(date, Time::MIDNIGHT, zone),
            end: local_to_unix(date, END_OF_DAY, zone),
        }
    }

    /// Seconds between the first and last instant of the window.
    pub fn span(&self) -> i64 {
        self.end - self.start
    }
}

/// Parses `YYYY-MM-DD`.
pub fn parse_calendar_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

// In a spring-forward gap the offset in force at the naive guess wins.
fn local_to_unix(date: Date, wall_clock: Time, zone: &TimeZone) -> i64 {
    let guess = PrimitiveDateTime::new(date, wall_clock).assume_utc().unix_timestamp();
    let offset = jiff::Timestamp::from_second(guess)
        .map(|instant| i64::from(zone.to_offset(instant).seconds()))
        .unwrap_or(0);
    guess - offset
}
