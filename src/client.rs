// Copyright (C) 2024 Daniel Mueller <deso@posteo.net>
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Context as _;
use anyhow::Result;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDate;

use reqwest::Client as HttpClient;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use tracing::debug;

use crate::dividends::DividendRecord;


/// The Polygon API endpoint to converse with by default.
const DEFAULT_BASE_URL: &str = "https://api.polygon.io";


/// The status of the individual US equity exchanges.
#[derive(Debug, Deserialize)]
pub struct Exchanges {
  pub nyse: String,
  pub nasdaq: String,
  pub otc: String,
}


/// The status of the currency markets.
#[derive(Debug, Deserialize)]
pub struct Currencies {
  pub fx: String,
  pub crypto: String,
}


/// The market status as reported by `/v1/marketstatus/now`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatus {
  /// The server side time the status was captured at.
  pub server_time: DateTime<FixedOffset>,
  /// The overall status of the US equity market.
  pub market: String,
  pub exchanges: Exchanges,
  pub currencies: Currencies,
}


/// The response to a dividend query for a single ticker.
#[derive(Debug, Deserialize)]
pub struct Dividends {
  /// The number of records found.
  #[serde(default)]
  pub count: u64,
  /// The records themselves, in no particular order.
  #[serde(default)]
  pub results: Vec<DividendRecord>,
}


/// A single aggregate window.
#[derive(Debug, Deserialize)]
pub struct Bar {
  /// The open price.
  #[serde(rename = "o")]
  pub open: f64,
  /// The highest price.
  #[serde(rename = "h")]
  pub high: f64,
  /// The lowest price.
  #[serde(rename = "l")]
  pub low: f64,
  /// The close price.
  #[serde(rename = "c")]
  pub close: f64,
  /// The trading volume.
  #[serde(rename = "v")]
  pub volume: f64,
  /// The volume weighted average price.
  #[serde(rename = "vw", default)]
  pub vwap: Option<f64>,
  /// The start of the window as Unix time in milliseconds.
  #[serde(rename = "t")]
  pub time: i64,
  /// The number of items aggregated into the window.
  #[serde(rename = "n", default)]
  pub items: Option<u64>,
}


/// The response to an aggregates query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
  /// The ticker symbol the bars belong to.
  pub ticker: String,
  /// The number of base aggregates used to form the response.
  #[serde(default)]
  pub query_count: u64,
  /// The number of results returned.
  #[serde(default)]
  pub results_count: u64,
  /// A request identifier assigned by the server.
  #[serde(rename = "request_id", default)]
  pub request_id: Option<String>,
  /// The bars themselves.
  #[serde(default)]
  pub results: Vec<Bar>,
}


/// The parameters of an aggregates query.
#[derive(Clone, Debug)]
pub struct AggregateReq {
  /// The ticker symbol to query bars for.
  pub ticker: String,
  /// The size of the timespan multiplier.
  pub multiplier: u32,
  /// The size of the time window (minute, hour, day, week, month,
  /// quarter, or year).
  pub timespan: String,
  /// The start of the aggregate window.
  pub from: NaiveDate,
  /// The end of the aggregate window.
  pub to: NaiveDate,
  /// Whether results should not be adjusted for splits.
  pub unadjusted: bool,
  /// The sort order by timestamp (`asc` or `desc`).
  pub sort: String,
  /// The maximum number of base aggregates queried.
  pub limit: u32,
}


/// A client for the subset of the Polygon REST API we converse with.
/// The wire protocol is not our business beyond issuing requests and
/// decoding responses into the types above.
#[derive(Debug)]
pub struct Client {
  http: HttpClient,
  base_url: String,
  api_key: String,
}

impl Client {
  /// Create a new client using the provided API key.
  pub fn new(api_key: String) -> Self {
    Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key)
  }

  /// Create a new client conversing with the given endpoint.
  pub fn with_base_url(base_url: String, api_key: String) -> Self {
    Self {
      http: HttpClient::new(),
      base_url,
      api_key,
    }
  }

  /// Issue a GET request against the given path and decode the
  /// response.
  async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
  where
    T: DeserializeOwned,
  {
    let url = format!("{}{}", self.base_url, path);
    debug!("GET {}", url);

    let response = self
      .http
      .get(&url)
      .query(query)
      .query(&[("apiKey", self.api_key.as_str())])
      .send()
      .await
      .with_context(|| format!("failed to issue request for {}", path))?
      .error_for_status()
      .with_context(|| format!("request for {} failed", path))?;

    response
      .json::<T>()
      .await
      .with_context(|| format!("failed to decode response for {}", path))
  }

  /// Retrieve the current market status.
  pub async fn market_status(&self) -> Result<MarketStatus> {
    self.get("/v1/marketstatus/now", &[]).await
  }

  /// Retrieve the dividend history for the given ticker.
  pub async fn dividends(&self, ticker: &str) -> Result<Dividends> {
    let path = format!("/v2/reference/dividends/{}", ticker.to_uppercase());
    self.get(&path, &[]).await
  }

  /// Retrieve aggregate bars for a ticker over a date range in custom
  /// time window sizes, e.g., 5-minute bars for `multiplier` 5 and
  /// `timespan` minute.
  pub async fn aggregates(&self, request: &AggregateReq) -> Result<Aggregates> {
    let path = format!(
      "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
      request.ticker.to_uppercase(),
      request.multiplier,
      request.timespan,
      request.from.format("%Y-%m-%d"),
      request.to.format("%Y-%m-%d"),
    );
    let query = [
      ("unadjusted", request.unadjusted.to_string()),
      ("sort", request.sort.clone()),
      ("limit", request.limit.to_string()),
    ];
    self.get(&path, &query).await
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  use chrono::NaiveDate;


  #[test]
  fn decode_market_status() {
    let json = r#"{
      "market": "extended-hours",
      "serverTime": "2020-11-10T17:37:37-05:00",
      "exchanges": {
        "nyse": "extended-hours",
        "nasdaq": "extended-hours",
        "otc": "closed"
      },
      "currencies": {
        "fx": "open",
        "crypto": "open"
      }
    }"#;

    let status = serde_json::from_str::<MarketStatus>(json).unwrap();
    assert_eq!(status.market, "extended-hours");
    assert_eq!(status.server_time.to_rfc3339(), "2020-11-10T17:37:37-05:00");
    assert_eq!(status.exchanges.nyse, "extended-hours");
    assert_eq!(status.exchanges.otc, "closed");
    assert_eq!(status.currencies.crypto, "open");
  }

  #[test]
  fn decode_dividends() {
    let json = r#"{
      "status": "OK",
      "count": 2,
      "results": [
        {
          "ticker": "BAC",
          "exDate": "2013-12-04",
          "paymentDate": "2013-12-27",
          "recordDate": "2013-12-06",
          "declaredDate": "2013-10-24",
          "amount": 0.01
        },
        {
          "ticker": "BAC",
          "exDate": "2014-03-05",
          "amount": 0.01
        }
      ]
    }"#;

    let dividends = serde_json::from_str::<Dividends>(json).unwrap();
    assert_eq!(dividends.count, 2);
    assert_eq!(dividends.results.len(), 2);

    let first = &dividends.results[0];
    assert_eq!(first.ticker, "BAC");
    assert_eq!(first.ex_date, NaiveDate::from_ymd_opt(2013, 12, 4).unwrap());
    assert_eq!(
      first.payment_date,
      Some(NaiveDate::from_ymd_opt(2013, 12, 27).unwrap())
    );
    assert_eq!(first.amount, 0.01);
    // The optional dates may simply be absent.
    assert_eq!(dividends.results[1].payment_date, None);
  }

  #[test]
  fn decode_empty_dividends() {
    let dividends = serde_json::from_str::<Dividends>(r#"{"status": "OK"}"#).unwrap();
    assert_eq!(dividends.count, 0);
    assert!(dividends.results.is_empty());
  }

  #[test]
  fn decode_aggregates() {
    let json = r#"{
      "ticker": "AMD",
      "status": "OK",
      "adjusted": false,
      "queryCount": 2,
      "resultsCount": 2,
      "request_id": "6a7e466379af0a71039d60cc78e72282",
      "results": [
        {
          "o": 92.39,
          "h": 92.5,
          "l": 92.2,
          "c": 92.3,
          "v": 14574,
          "vw": 92.35,
          "t": 1609804800000,
          "n": 120
        },
        {
          "o": 92.3,
          "h": 92.41,
          "l": 92.3,
          "c": 92.41,
          "v": 8762,
          "t": 1609804860000
        }
      ]
    }"#;

    let aggregates = serde_json::from_str::<Aggregates>(json).unwrap();
    assert_eq!(aggregates.ticker, "AMD");
    assert_eq!(aggregates.query_count, 2);
    assert_eq!(aggregates.results_count, 2);
    assert_eq!(
      aggregates.request_id.as_deref(),
      Some("6a7e466379af0a71039d60cc78e72282")
    );

    let bar = &aggregates.results[0];
    assert_eq!(bar.open, 92.39);
    assert_eq!(bar.close, 92.3);
    assert_eq!(bar.time, 1609804800000);
    assert_eq!(bar.items, Some(120));
    assert_eq!(aggregates.results[1].vwap, None);
  }
}
