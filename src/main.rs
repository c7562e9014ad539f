// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

mod args;
mod client;
mod config;
mod dates;
mod dividends;
mod pnl;

use std::fs::File;
use std::io::stdout;
use std::io::Write as _;
use std::path::Path;
use std::process::exit;

use anyhow::anyhow;
use anyhow::Context as _;
use anyhow::Result;

use chrono::Local;
use chrono::NaiveDate;

use futures::future::try_join_all;

use structopt::StructOpt as _;

use tokio::runtime::Runtime;

use tracing::subscriber::set_global_default as set_global_subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::FmtSubscriber;

use crate::args::Args;
use crate::args::Command;
use crate::client::AggregateReq;
use crate::client::Client;
use crate::dividends::DividendSummary;
use crate::pnl::Activity;
use crate::pnl::Filter;
use crate::pnl::PnlReport;
use crate::pnl::WithdrawalReport;


/// Retrieve the API key from the configuration file, pointing at
/// `configure` if none is set.
fn require_api_key(config_path: &Path) -> Result<String> {
  config::api_key(config_path)?.ok_or_else(|| {
    anyhow!(
      "no API key configured in {}; run `trademin configure --api-key KEY`",
      config_path.display()
    )
  })
}


/// Store or display the Polygon API key.
fn configure(config_path: &Path, api_key: Option<&str>, overwrite: bool) -> Result<()> {
  match api_key {
    Some(key) => {
      config::save(config_path, config::API_KEY, key, overwrite)?;
      println!("API key saved to {}", config_path.display());
    },
    None => match config::api_key(config_path)? {
      Some(key) => println!("API key found in {}:\n\t{}", config_path.display(), key),
      None => println!("API key not found in {}", config_path.display()),
    },
  }
  Ok(())
}


/// Print a summary of the current market status.
async fn market_status(client: &Client) -> Result<()> {
  let status = client.market_status().await?;
  println!(
    "As of {time}\n  \
     Global Crypto:\t{crypto}\n  \
     Global FX:\t\t{fx}\n  \
     US Stocks:\t\t{market}\n\
     \tNYSE:\t\t{nyse}\n\
     \tNASDAQ:\t\t{nasdaq}\n\
     \tOTC:\t\t{otc}\n",
    time = status.server_time,
    crypto = status.currencies.crypto,
    fx = status.currencies.fx,
    market = status.market,
    nyse = status.exchanges.nyse,
    nasdaq = status.exchanges.nasdaq,
    otc = status.exchanges.otc,
  );
  Ok(())
}


/// Print a single ticker's dividend summary.
fn print_dividend_summary(ticker: &str, summary: &DividendSummary, today: NaiveDate) {
  println!("Summary: {} as of {}", ticker.to_uppercase(), today);
  println!("  Total:  {}", summary.count);

  if let Some(last) = &summary.last {
    println!("  Last:   ${} on {}", last.amount, last.ex_date);
  }
  if let Some(next) = &summary.next {
    if next.is_guessed() {
      println!("  Next:   {} (ESTIMATE)", next.record().ex_date);
    } else {
      println!("  Next:   {}", next.record().ex_date);
    }
  }
  println!("---");
}


/// Print dividend summaries for the given tickers.
async fn dividend_summaries(client: &Client, tickers: &[String], today: NaiveDate) -> Result<()> {
  let queries = tickers.iter().map(|ticker| client.dividends(ticker));
  let responses = try_join_all(queries)
    .await
    .with_context(|| "failed to retrieve dividend records")?;

  for (ticker, response) in tickers.iter().zip(responses) {
    let summary = DividendSummary::new(response.count, response.results, today);
    print_dividend_summary(ticker, &summary, today);
  }
  Ok(())
}


/// Print aggregate bars for a ticker.
async fn aggregate_bars(client: &Client, args: &args::Aggregates, today: NaiveDate) -> Result<()> {
  let request = AggregateReq {
    ticker: args.ticker.clone(),
    multiplier: args.multiplier,
    timespan: args.timespan.clone(),
    from: dates::parse_user_date(&args.from, today)?,
    to: dates::parse_user_date(&args.to, today)?,
    unadjusted: !args.adjusted,
    sort: args.sort.clone(),
    limit: args.limit,
  };
  let aggregates = client
    .aggregates(&request)
    .await
    .with_context(|| format!("failed to retrieve aggregates for {}", args.ticker))?;

  println!("{}: {} bars", aggregates.ticker, aggregates.results_count);
  for bar in &aggregates.results {
    // Windows are stamped in New York time, irrespective of where we
    // run.
    let time = dates::millis_to_new_york(bar.time)?;
    println!(
      "{time}  open {open:>9.2}  high {high:>9.2}  low {low:>9.2}  close {close:>9.2}  volume {volume:>12}",
      time = time.format("%Y-%m-%d %H:%M %Z"),
      open = bar.open,
      high = bar.high,
      low = bar.low,
      close = bar.close,
      volume = bar.volume,
    );
  }
  Ok(())
}


/// Load activities from the transaction export at the given path.
fn load_activities(path: &Path) -> Result<Vec<Activity>> {
  let file = File::open(path)
    .with_context(|| format!("failed to open transaction export {}", path.display()))?;
  pnl::load_activities(file)
    .with_context(|| format!("failed to read transaction export {}", path.display()))
}


/// Assemble an activity filter from command line strings.
fn make_filter(
  ticker: Option<&str>,
  from: Option<&str>,
  to: Option<&str>,
  today: NaiveDate,
) -> Result<Filter> {
  let from = from
    .map(|string| dates::parse_user_date(string, today))
    .transpose()?;
  let to = to
    .map(|string| dates::parse_user_date(string, today))
    .transpose()?;
  Ok(Filter {
    ticker: ticker.map(str::to_string),
    from,
    to,
  })
}


/// Describe the scope of a report, e.g., "AMD from 2021-01-01".
fn report_title(filter: &Filter) -> String {
  let ticker = filter
    .ticker
    .as_ref()
    .map(|ticker| ticker.to_uppercase())
    .unwrap_or_else(|| "all symbols".to_string());

  match (filter.from, filter.to) {
    (Some(from), Some(to)) => format!("{} from {} to {}", ticker, from, to),
    (Some(from), None) => format!("{} from {}", ticker, from),
    (None, Some(to)) => format!("{} through {}", ticker, to),
    (None, None) => ticker,
  }
}


/// Summarize profit & loss from a transaction export.
fn pnl_summary(args: &args::Pnl, today: NaiveDate) -> Result<()> {
  let activities = load_activities(&args.load)?;
  let filter = make_filter(
    args.ticker.as_deref(),
    args.from.as_deref(),
    args.to.as_deref(),
    today,
  )?;
  let report = PnlReport::new(&activities, &filter);
  print!("{}", report.render(&report_title(&filter)));
  Ok(())
}


/// Summarize withdrawals from a transaction export.
fn withdrawal_summary(args: &args::Withdrawals, today: NaiveDate) -> Result<()> {
  let activities = load_activities(&args.load)?;
  let filter = make_filter(None, args.from.as_deref(), args.to.as_deref(), today)?;
  let report = WithdrawalReport::new(&activities, &filter);
  print!("{}", report.render(&report_title(&filter)));
  Ok(())
}


async fn run() -> Result<()> {
  let args = Args::from_args();
  let level = match args.verbosity {
    0 => LevelFilter::WARN,
    1 => LevelFilter::INFO,
    2 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  };

  let subscriber = FmtSubscriber::builder()
    .with_max_level(level)
    .with_timer(ChronoLocal::rfc_3339())
    .finish();

  set_global_subscriber(subscriber).with_context(|| "failed to set tracing subscriber")?;

  let config_path = args
    .config
    .clone()
    .unwrap_or_else(config::default_path);
  let today = Local::now().date_naive();

  match &args.command {
    Command::Configure(configure_args) => configure(
      &config_path,
      configure_args.api_key.as_deref(),
      configure_args.overwrite,
    ),
    Command::Status => {
      let api_key = require_api_key(&config_path)?;
      market_status(&Client::new(api_key)).await
    },
    Command::Dividends(dividend_args) => {
      let api_key = require_api_key(&config_path)?;
      dividend_summaries(&Client::new(api_key), &dividend_args.tickers, today).await
    },
    Command::Aggregates(aggregate_args) => {
      let api_key = require_api_key(&config_path)?;
      aggregate_bars(&Client::new(api_key), aggregate_args, today).await
    },
    Command::Pnl(pnl_args) => pnl_summary(pnl_args, today),
    Command::Withdrawals(withdrawal_args) => withdrawal_summary(withdrawal_args, today),
  }
}

fn main() {
  let rt = Runtime::new().unwrap();
  let exit_code = rt
    .block_on(run())
    .map(|_| 0)
    .map_err(|e| {
      eprint!("{}", e);
      e.chain().skip(1).for_each(|cause| eprint!(": {}", cause));
      eprintln!();
    })
    .unwrap_or(1);
  // We exit the process the hard way next, so make sure to flush
  // buffered content.
  let _ = stdout().flush();
  exit(exit_code)
}
