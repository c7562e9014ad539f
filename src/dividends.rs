// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeMap;

use chrono::Datelike as _;
use chrono::NaiveDate;

use serde::Deserialize;

use crate::dates::one_year_after;


/// A single dividend event as reported by Polygon's reference API.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DividendRecord {
  /// The ticker symbol the dividend applies to.
  pub ticker: String,
  /// The ex-dividend date, i.e., the cut off for payout eligibility.
  #[serde(rename = "exDate")]
  pub ex_date: NaiveDate,
  /// The date the dividend is paid out.
  #[serde(rename = "paymentDate", default)]
  pub payment_date: Option<NaiveDate>,
  /// The date by which shares have to be held on record.
  #[serde(rename = "recordDate", default)]
  pub record_date: Option<NaiveDate>,
  /// The date the dividend was announced.
  #[serde(rename = "declaredDate", default)]
  pub declared_date: Option<NaiveDate>,
  /// The payout per share.
  pub amount: f64,
}


/// The next dividend to expect for a ticker, either taken verbatim from
/// the data or projected from historical patterns.
#[derive(Clone, Debug, PartialEq)]
pub enum NextDividend {
  /// A published record whose ex-date has not passed yet.
  Scheduled(DividendRecord),
  /// A projection: the most recent record of the likeliest upcoming
  /// month, dated one year later. Not confirmed by the data source.
  Guessed(DividendRecord),
}

impl NextDividend {
  /// The underlying dividend record.
  pub fn record(&self) -> &DividendRecord {
    match self {
      Self::Scheduled(record) | Self::Guessed(record) => record,
    }
  }

  /// Whether this dividend is a projection rather than a published
  /// record.
  pub fn is_guessed(&self) -> bool {
    matches!(self, Self::Guessed(..))
  }
}


/// A per-ticker dividend summary, recomputed for every query.
#[derive(Clone, Debug)]
pub struct DividendSummary {
  /// The number of records the data source reported.
  pub count: u64,
  /// The records themselves.
  pub results: Vec<DividendRecord>,
  /// The most recent dividend on record.
  pub last: Option<DividendRecord>,
  /// The next dividend to expect, if one could be determined.
  pub next: Option<NextDividend>,
}

impl DividendSummary {
  /// Summarize a ticker's dividend history as of the given date.
  pub fn new(count: u64, results: Vec<DividendRecord>, today: NaiveDate) -> Self {
    let last = last(&results).cloned();
    let next = next(&results, today, true);
    Self {
      count,
      results,
      last,
      next,
    }
  }
}


/// Find the most recent dividend, i.e., the one with the maximum
/// ex-date. Ties on the date may resolve to either contender.
pub fn last(records: &[DividendRecord]) -> Option<&DividendRecord> {
  records.iter().max_by_key(|record| record.ex_date)
}


/// Determine the next dividend to expect.
///
/// If the most recent record's ex-date has not passed yet, that record
/// is the next dividend. Otherwise, with `allow_guess` set, a
/// projection is inferred from the months past dividends fell in.
pub fn next(
  records: &[DividendRecord],
  today: NaiveDate,
  allow_guess: bool,
) -> Option<NextDividend> {
  let most_recent = last(records)?;
  if most_recent.ex_date >= today {
    return Some(NextDividend::Scheduled(most_recent.clone()))
  }

  if allow_guess {
    guess(records, today).map(NextDividend::Guessed)
  } else {
    None
  }
}


/// Project the next dividend from historical monthly patterns.
///
/// The four months dividends most commonly fell in are considered, in
/// ascending order, and the first one not before the current month wins
/// (December counts as month zero here, so a December "today" treats
/// every candidate as upcoming). When every candidate is before the
/// current month, the earliest one is chosen even though it already
/// passed this year. That matches the long-standing behavior and is
/// deliberately left alone.
fn guess(records: &[DividendRecord], today: NaiveDate) -> Option<DividendRecord> {
  let mut counts = BTreeMap::<u32, usize>::new();
  for record in records {
    *counts.entry(record.ex_date.month()).or_insert(0) += 1;
  }

  // Rank months by how often dividends fell into them, most frequent
  // first, ties resolved towards the earlier month.
  let mut ranked = counts.into_iter().collect::<Vec<_>>();
  ranked.sort_by(|&(month1, count1), &(month2, count2)| {
    count2.cmp(&count1).then(month1.cmp(&month2))
  });

  let mut candidates = ranked
    .into_iter()
    .take(4)
    .map(|(month, _count)| month)
    .collect::<Vec<_>>();
  candidates.sort_unstable();

  let current = if today.month() == 12 { 0 } else { today.month() };
  let month = candidates
    .iter()
    .copied()
    .find(|candidate| *candidate >= current)
    .or_else(|| candidates.first().copied())?;

  let source = records
    .iter()
    .filter(|record| record.ex_date.month() == month)
    .max_by_key(|record| record.ex_date)?;

  Some(DividendRecord {
    ticker: source.ticker.clone(),
    ex_date: one_year_after(source.ex_date),
    payment_date: None,
    record_date: None,
    declared_date: None,
    amount: source.amount,
  })
}


#[cfg(test)]
mod tests {
  use super::*;


  fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
  }

  fn record(ex_date: NaiveDate) -> DividendRecord {
    DividendRecord {
      ticker: "BAC".to_string(),
      ex_date,
      payment_date: None,
      record_date: None,
      declared_date: None,
      amount: 0.01,
    }
  }

  /// A quarterly Feb/May/Aug/Nov payer with two years of history.
  fn quarterly() -> Vec<DividendRecord> {
    [
      date(2019, 2, 7),
      date(2019, 5, 9),
      date(2019, 8, 8),
      date(2019, 11, 7),
      date(2020, 2, 6),
      date(2020, 5, 7),
      date(2020, 8, 6),
      date(2020, 11, 5),
    ]
    .into_iter()
    .map(record)
    .collect()
  }


  #[test]
  fn empty_history() {
    assert_eq!(last(&[]), None);
    assert_eq!(next(&[], date(2021, 1, 1), true), None);
  }

  #[test]
  fn last_is_maximum_ex_date() {
    let records = quarterly();
    assert_eq!(last(&records).unwrap().ex_date, date(2020, 11, 5));
  }

  #[test]
  fn last_with_tied_dates() {
    let records = vec![record(date(2020, 11, 5)), record(date(2020, 11, 5))];
    // Either contender is acceptable; the date is what matters.
    assert_eq!(last(&records).unwrap().ex_date, date(2020, 11, 5));
  }

  #[test]
  fn future_record_is_the_next_dividend() {
    let mut records = quarterly();
    records.push(record(date(2021, 2, 4)));

    let next = next(&records, date(2021, 1, 15), true).unwrap();
    assert!(!next.is_guessed());
    assert_eq!(next.record(), &record(date(2021, 2, 4)));
  }

  #[test]
  fn record_dated_today_still_counts() {
    let today = date(2021, 2, 4);
    let records = vec![record(today)];

    let next = next(&records, today, true).unwrap();
    assert!(!next.is_guessed());
    assert_eq!(next.record().ex_date, today);
  }

  #[test]
  fn no_guessing_when_disallowed() {
    let records = vec![record(date(2020, 11, 5))];
    assert_eq!(next(&records, date(2020, 11, 6), false), None);
  }

  #[test]
  fn guess_from_single_record() {
    let records = vec![record(date(2020, 11, 5))];

    let next = next(&records, date(2021, 3, 10), true).unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 11, 5));
    assert_eq!(next.record().ticker, "BAC");
    assert_eq!(next.record().payment_date, None);
  }

  #[test]
  fn guess_picks_first_upcoming_month() {
    // Candidates are Feb/May/Aug/Nov; mid June the first candidate not
    // before the current month is August.
    let next = next(&quarterly(), date(2021, 6, 15), true).unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 8, 6));
  }

  #[test]
  fn guess_uses_most_recent_record_of_month() {
    // Both February records qualify; the 2020 one is the source.
    let next = next(&quarterly(), date(2021, 1, 10), true).unwrap();
    assert_eq!(next.record().ex_date, date(2021, 2, 6));
  }

  #[test]
  fn guess_in_december_wraps_around() {
    // December counts as month zero, so every candidate is upcoming
    // and the earliest month of the year wins.
    let next = next(&quarterly(), date(2020, 12, 15), true).unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 2, 6));
  }

  #[test]
  fn guess_falls_back_to_earliest_month() {
    // All candidate months lie before October; the earliest one is
    // chosen even though it already passed this year.
    let records = [
      date(2020, 1, 9),
      date(2020, 2, 6),
      date(2020, 3, 5),
      date(2020, 4, 2),
    ]
    .into_iter()
    .map(record)
    .collect::<Vec<_>>();

    let next = next(&records, date(2020, 10, 20), true).unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 1, 9));
  }

  #[test]
  fn guess_limits_candidates_to_four_months() {
    // Jan only paid once; the quarterly months outrank it and push it
    // out of the candidate set, so late December resolves to February.
    let mut records = quarterly();
    records.push(record(date(2019, 1, 3)));

    let next = next(&records, date(2020, 12, 28), true).unwrap();
    assert_eq!(next.record().ex_date, date(2021, 2, 6));
  }

  #[test]
  fn guess_from_leap_day() {
    let records = vec![record(date(2020, 2, 29))];

    let next = next(&records, date(2020, 10, 1), true).unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 2, 28));
  }

  #[test]
  fn summary_assembles_last_and_next() {
    let records = quarterly();
    let summary = DividendSummary::new(records.len() as u64, records, date(2021, 1, 10));

    assert_eq!(summary.count, 8);
    assert_eq!(summary.last.as_ref().unwrap().ex_date, date(2020, 11, 5));
    let next = summary.next.as_ref().unwrap();
    assert!(next.is_guessed());
    assert_eq!(next.record().ex_date, date(2021, 2, 6));
  }
}
