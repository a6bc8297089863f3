use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};

/// Dates are persisted day first, e.g. `04/07/2018`.
pub const RECORD_DATE_FORMAT: &str = "%d/%m/%Y";

const NOON: NaiveTime = match NaiveTime::from_hms_opt(12, 0, 0) {
    Some(v) => v,
    None => panic!("noon is a valid time"),
};

/// This is the standard way of converting a date to a string in day-tracker.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

pub fn record_name_to_date(name: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(name, RECORD_DATE_FORMAT)
        .with_context(|| format!("Can't parse {name:?} as a record date"))
}

/// English weekday name, the key used by the catalog for weekday specific tasks.
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Returns the calendar day after `date` in `tz`.
///
/// The step is taken from noon of `date` and is exactly 24 hours long, so days that are 23 or 25
/// hours long because of a daylight saving switch still land on the next date.
pub fn next_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<NaiveDate> {
    let stepped = tz
        .from_local_datetime(&date.and_time(NOON))
        .earliest()
        .and_then(|anchor| anchor.checked_add_signed(Duration::hours(24)))
        .map(|v| v.date_naive());
    stepped
        .or_else(|| date.succ_opt())
        .ok_or_else(|| anyhow!("There is no day after {date}"))
}
