// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::anyhow;
use anyhow::Context as _;
use anyhow::Result;

use chrono::DateTime;
use chrono::Datelike as _;
use chrono::NaiveDate;
use chrono::TimeZone as _;
use chrono::Utc;

use chrono_tz::America::New_York;
use chrono_tz::Tz;


/// Parse a user supplied date string.
///
/// Accepts ISO dates (`2021-01-04`) as well as the keywords `today` and
/// `yesterday`, resolved against the provided reference date.
pub fn parse_user_date(string: &str, today: NaiveDate) -> Result<NaiveDate> {
  let string = string.trim().to_lowercase();
  match string.as_str() {
    "today" => Ok(today),
    "yesterday" => today
      .pred_opt()
      .ok_or_else(|| anyhow!("no day before {}", today)),
    other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
      .with_context(|| format!("failed to parse date string '{}'", other)),
  }
}


/// Convert a Unix millisecond timestamp into New York wall clock time,
/// the time zone aggregate windows are reported in.
pub fn millis_to_new_york(millis: i64) -> Result<DateTime<Tz>> {
  let time = Utc
    .timestamp_millis_opt(millis)
    .single()
    .ok_or_else(|| anyhow!("timestamp {} ms is out of range", millis))?;
  Ok(time.with_timezone(&New_York))
}


/// Advance a date by one calendar year.
pub fn one_year_after(date: NaiveDate) -> NaiveDate {
  match date.with_year(date.year() + 1) {
    Some(next) => next,
    // February 29 with no counterpart in the target year.
    None => NaiveDate::from_ymd_opt(date.year() + 1, date.month(), 28).unwrap(),
  }
}


#[cfg(test)]
mod tests {
  use super::*;


  fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
  }

  #[test]
  fn parse_keywords() {
    let today = date(2021, 3, 1);
    assert_eq!(parse_user_date("today", today).unwrap(), today);
    assert_eq!(parse_user_date("Yesterday", today).unwrap(), date(2021, 2, 28));
    assert_eq!(parse_user_date("  TODAY ", today).unwrap(), today);
  }

  #[test]
  fn parse_iso_dates() {
    let today = date(2021, 3, 1);
    assert_eq!(parse_user_date("2021-01-04", today).unwrap(), date(2021, 1, 4));
    assert!(parse_user_date("01/04/2021", today).is_err());
    assert!(parse_user_date("gibberish", today).is_err());
  }

  #[test]
  fn convert_millis() {
    // 2021-01-05T00:00:00Z is still the 4th on the East Coast.
    let time = millis_to_new_york(1609804800000).unwrap();
    assert_eq!(time.to_rfc3339(), "2021-01-04T19:00:00-05:00");
  }

  #[test]
  fn advance_year() {
    assert_eq!(one_year_after(date(2020, 11, 5)), date(2021, 11, 5));
    assert_eq!(one_year_after(date(2020, 2, 29)), date(2021, 2, 28));
    assert_eq!(one_year_after(date(2019, 2, 28)), date(2020, 2, 28));
  }
}
