// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use structopt::StructOpt;


/// A command line tool for summarizing Polygon.io market data and
/// Firstrade transaction history.
#[derive(Debug, StructOpt)]
pub struct Args {
  #[structopt(subcommand)]
  pub command: Command,
  /// The path to the JSON configuration file holding the Polygon API
  /// key [default: ~/.config/trademin/polygon.json].
  #[structopt(short, long, global = true)]
  pub config: Option<PathBuf>,
  /// Increase verbosity (can be supplied multiple times).
  #[structopt(short = "v", long = "verbose", global = true, parse(from_occurrences))]
  pub verbosity: usize,
}


/// A command of the program.
#[derive(Debug, StructOpt)]
pub enum Command {
  /// Store or display the Polygon API key.
  Configure(Configure),
  /// Display a summary of the current market status.
  Status,
  /// Display dividend summaries for the given tickers.
  Dividends(Dividends),
  /// Retrieve aggregate bars for a ticker.
  Aggregates(Aggregates),
  /// Summarize profit & loss from a Firstrade transaction export.
  Pnl(Pnl),
  /// Summarize withdrawals from a Firstrade transaction export.
  Withdrawals(Withdrawals),
}


/// An options object for the `configure` command.
#[derive(Debug, StructOpt)]
pub struct Configure {
  /// The API key to store; when absent the currently configured key is
  /// displayed instead.
  #[structopt(long)]
  pub api_key: Option<String>,
  /// Replace an already configured key.
  #[structopt(long)]
  pub overwrite: bool,
}


/// An options object for the `dividends` command.
#[derive(Debug, StructOpt)]
pub struct Dividends {
  /// The ticker symbols to summarize dividends for.
  #[structopt(required = true)]
  pub tickers: Vec<String>,
}


/// An options object for the `aggregates` command.
#[derive(Debug, StructOpt)]
pub struct Aggregates {
  /// The ticker symbol to retrieve bars for.
  pub ticker: String,
  /// The start of the aggregate window (yyyy-mm-dd, today, or
  /// yesterday).
  #[structopt(long, default_value = "yesterday")]
  pub from: String,
  /// The end of the aggregate window (yyyy-mm-dd, today, or
  /// yesterday).
  #[structopt(long, default_value = "yesterday")]
  pub to: String,
  /// The size of the timespan multiplier.
  #[structopt(long, default_value = "1")]
  pub multiplier: u32,
  /// The size of the time window (minute, hour, day, week, month,
  /// quarter, or year).
  #[structopt(long, default_value = "minute")]
  pub timespan: String,
  /// Request results adjusted for splits.
  #[structopt(long)]
  pub adjusted: bool,
  /// Sort bars by timestamp (asc or desc).
  #[structopt(long, default_value = "asc")]
  pub sort: String,
  /// The maximum number of base aggregates queried.
  #[structopt(long, default_value = "5000")]
  pub limit: u32,
}


/// An options object for the `pnl` command.
#[derive(Debug, StructOpt)]
pub struct Pnl {
  /// The path to the Firstrade transaction CSV export.
  #[structopt(long)]
  pub load: PathBuf,
  /// Only include activities for this symbol.
  #[structopt(long)]
  pub ticker: Option<String>,
  /// Only include activities traded at or after this date
  /// (yyyy-mm-dd, today, or yesterday).
  #[structopt(long)]
  pub from: Option<String>,
  /// Only include activities traded at or before this date
  /// (yyyy-mm-dd, today, or yesterday).
  #[structopt(long)]
  pub to: Option<String>,
}


/// An options object for the `withdrawals` command.
#[derive(Debug, StructOpt)]
pub struct Withdrawals {
  /// The path to the Firstrade transaction CSV export.
  #[structopt(long)]
  pub load: PathBuf,
  /// Only include withdrawals traded at or after this date
  /// (yyyy-mm-dd, today, or yesterday).
  #[structopt(long)]
  pub from: Option<String>,
  /// Only include withdrawals traded at or before this date
  /// (yyyy-mm-dd, today, or yesterday).
  #[structopt(long)]
  pub to: Option<String>,
}
