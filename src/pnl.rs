// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::Read;

use anyhow::Context as _;
use anyhow::Result;

use chrono::NaiveDate;

use csv::ReaderBuilder;
use csv::Trim;

use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;


/// Parse a date cell, accepting both the ISO (`2021-01-04`) and the US
/// (`01/04/2021`) form as they appear in Firstrade exports.
fn parse_csv_date(string: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(string, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(string, "%m/%d/%Y"))
    .ok()
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
  D: Deserializer<'de>,
{
  let string = String::deserialize(deserializer)?;
  parse_csv_date(string.trim())
    .ok_or_else(|| D::Error::custom(format!("invalid date cell: {}", string)))
}

fn deserialize_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let string = String::deserialize(deserializer)?;
  let string = string.trim();
  if string.is_empty() {
    return Ok(None)
  }
  parse_csv_date(string)
    .map(Some)
    .ok_or_else(|| D::Error::custom(format!("invalid date cell: {}", string)))
}

/// Parse a numeric cell that may be blank.
fn deserialize_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let string = String::deserialize(deserializer)?;
  let string = string.trim();
  if string.is_empty() {
    return Ok(None)
  }
  string.parse::<f64>().map(Some).map_err(D::Error::custom)
}


/// A single row of a Firstrade transaction history export.
#[derive(Clone, Debug, Deserialize)]
pub struct Activity {
  /// The ticker symbol; empty for pure cash movements.
  #[serde(rename = "Symbol", default)]
  pub symbol: String,
  /// The number of shares moved; blank for non-trades.
  #[serde(rename = "Quantity", deserialize_with = "deserialize_opt_f64", default)]
  pub quantity: Option<f64>,
  /// The per-share price; blank for non-trades.
  #[serde(rename = "Price", deserialize_with = "deserialize_opt_f64", default)]
  pub price: Option<f64>,
  /// The broker's action code, e.g. BUY or SELL.
  #[serde(rename = "Action", default)]
  pub action: String,
  /// The free-form description; the basis for classification.
  #[serde(rename = "Description")]
  pub description: String,
  /// The date the activity was executed.
  #[serde(rename = "TradeDate", deserialize_with = "deserialize_date")]
  pub trade_date: NaiveDate,
  /// The date the activity settled.
  #[serde(rename = "SettledDate", deserialize_with = "deserialize_opt_date", default)]
  pub settled_date: Option<NaiveDate>,
  /// The signed cash amount of the activity.
  #[serde(rename = "Amount", deserialize_with = "deserialize_opt_f64", default)]
  pub amount: Option<f64>,
  /// The commission charged for the activity.
  #[serde(rename = "Commission", deserialize_with = "deserialize_opt_f64", default)]
  pub commission: Option<f64>,
  /// Regulatory and other fees charged for the activity.
  #[serde(rename = "Fee", deserialize_with = "deserialize_opt_f64", default)]
  pub fee: Option<f64>,
}


/// The rough classification of an activity, derived from its free-form
/// description.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActivityKind {
  /// A stock purchase.
  Buy,
  /// A stock sale.
  Sell,
  /// A dividend payment.
  Dividend,
  /// An interest payment.
  Interest,
  /// Cash leaving the account.
  CashOut,
  /// Cash entering the account.
  CashIn,
  /// Anything we do not interpret.
  Other,
}

impl Activity {
  /// Classify the activity based on its description.
  pub fn kind(&self) -> ActivityKind {
    let description = self.description.to_uppercase();
    if description.contains("BOUGHT") {
      ActivityKind::Buy
    } else if description.contains("SOLD") {
      ActivityKind::Sell
    } else if description.contains("DIVIDEND") {
      ActivityKind::Dividend
    } else if description.contains("INTEREST") {
      ActivityKind::Interest
    } else if description.contains("WIRE")
      || description.contains("ACH")
      || description.contains("WITHDRAW")
      || description.contains("DEPOSIT")
    {
      if self.amount.unwrap_or(0.0) < 0.0 {
        ActivityKind::CashOut
      } else {
        ActivityKind::CashIn
      }
    } else {
      ActivityKind::Other
    }
  }
}


/// Load activities from a Firstrade transaction history export.
pub fn load_activities<R>(reader: R) -> Result<Vec<Activity>>
where
  R: Read,
{
  let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
  let mut activities = Vec::new();

  for (index, result) in reader.deserialize().enumerate() {
    let activity = result.with_context(|| format!("failed to parse CSV record {}", index + 1))?;
    activities.push(activity);
  }
  Ok(activities)
}


/// Restrictions applied to activities before summarizing them.
#[derive(Clone, Debug, Default)]
pub struct Filter {
  /// Only consider activities for this symbol.
  pub ticker: Option<String>,
  /// Only consider activities traded at or after this date.
  pub from: Option<NaiveDate>,
  /// Only consider activities traded at or before this date.
  pub to: Option<NaiveDate>,
}

impl Filter {
  fn matches(&self, activity: &Activity) -> bool {
    if let Some(ticker) = &self.ticker {
      if !activity.symbol.eq_ignore_ascii_case(ticker) {
        return false
      }
    }
    if let Some(from) = self.from {
      if activity.trade_date < from {
        return false
      }
    }
    if let Some(to) = self.to {
      if activity.trade_date > to {
        return false
      }
    }
    true
  }
}


/// A profit & loss summary over a set of activities. Amounts keep the
/// sign the broker reported them with: purchases negative, proceeds
/// positive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PnlReport {
  /// The total spent on purchases.
  pub bought: f64,
  /// The number of shares bought.
  pub bought_shares: f64,
  /// The total proceeds from sales.
  pub sold: f64,
  /// The number of shares sold.
  pub sold_shares: f64,
  /// The total of regulatory and other fees.
  pub fees: f64,
  /// The total of commissions.
  pub commissions: f64,
  /// The total of dividend payments received.
  pub dividends: f64,
}

impl PnlReport {
  /// Summarize the given activities, honoring the filter.
  pub fn new(activities: &[Activity], filter: &Filter) -> Self {
    let mut report = Self::default();

    for activity in activities.iter().filter(|activity| filter.matches(activity)) {
      let amount = activity.amount.unwrap_or(0.0);
      let shares = activity.quantity.unwrap_or(0.0).abs();

      match activity.kind() {
        ActivityKind::Buy => {
          report.bought += amount;
          report.bought_shares += shares;
        },
        ActivityKind::Sell => {
          report.sold += amount;
          report.sold_shares += shares;
        },
        ActivityKind::Dividend => report.dividends += amount,
        _ => (),
      }

      report.commissions += activity.commission.unwrap_or(0.0);
      report.fees += activity.fee.unwrap_or(0.0);
    }
    report
  }

  /// The gross profit & loss: sale proceeds net of purchases.
  pub fn gross(&self) -> f64 {
    self.sold + self.bought
  }

  /// The net profit & loss after costs and dividends.
  pub fn net(&self) -> f64 {
    self.gross() - self.fees - self.commissions + self.dividends
  }

  /// Render the report.
  pub fn render(&self, title: &str) -> String {
    format!(
      r#"Summary for {title}
  Bought     : ${bought:.2} ({bought_shares} shares)
  Sold       : ${sold:.2} ({sold_shares} shares)
----------------------------------
  Gross PNL  : ${gross:.2}
----------------------------------
  Fees       : ${fees:.2}
  Commissions: ${commissions:.2}
  Dividends  : ${dividends:.2}
----------------------------------
  Net PNL    : ${net:.2}
"#,
      title = title,
      bought = self.bought,
      bought_shares = self.bought_shares,
      sold = self.sold,
      sold_shares = self.sold_shares,
      gross = self.gross(),
      fees = self.fees,
      commissions = self.commissions,
      dividends = self.dividends,
      net = self.net(),
    )
  }
}


/// A summary of cash withdrawn from the account.
#[derive(Clone, Debug, Default)]
pub struct WithdrawalReport {
  /// The outgoing cash movements, in trade date order.
  pub withdrawals: Vec<Activity>,
  /// Their total; negative, as reported by the broker.
  pub total: f64,
}

impl WithdrawalReport {
  /// Summarize the given activities, honoring the filter.
  pub fn new(activities: &[Activity], filter: &Filter) -> Self {
    let mut withdrawals = activities
      .iter()
      .filter(|activity| filter.matches(activity) && activity.kind() == ActivityKind::CashOut)
      .cloned()
      .collect::<Vec<_>>();
    withdrawals.sort_by_key(|activity| activity.trade_date);

    let total = withdrawals
      .iter()
      .map(|activity| activity.amount.unwrap_or(0.0))
      .sum();
    Self {
      withdrawals,
      total,
    }
  }

  /// Render the report.
  pub fn render(&self, title: &str) -> String {
    let mut output = format!("Withdrawals for {}\n", title);
    for activity in &self.withdrawals {
      output += &format!(
        "  {date}  ${amount:>12.2}  {description}\n",
        date = activity.trade_date,
        amount = activity.amount.unwrap_or(0.0),
        description = activity.description,
      );
    }
    output += &format!(
      "----------------------------------\n  Total ({count}): ${total:.2}\n",
      count = self.withdrawals.len(),
      total = self.total,
    );
    output
  }
}
