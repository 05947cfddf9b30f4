use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use crate::config::ProviderConfig;
use crate::data::gateway::{GatewayError, MarketDataGateway};
use crate::data::types::{OpenInterest, PricePoint, StrikeKey};

/// Yahoo Finance client (unofficial chart and options endpoints)
pub struct YahooClient {
    client: Client,
    base_url: String,
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<ChartIndicators>,
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    earnings: HashMap<String, EarningsEventData>,
}

#[derive(Debug, Deserialize)]
struct EarningsEventData {
    date: i64,
}

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: OptionChain,
}

#[derive(Debug, Deserialize)]
struct OptionChain {
    #[serde(default)]
    result: Vec<OptionChainData>,
}

#[derive(Debug, Deserialize)]
struct OptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionsByExpiry>,
}

#[derive(Debug, Deserialize)]
struct OptionsByExpiry {
    #[serde(default)]
    calls: Vec<ContractData>,
    #[serde(default)]
    puts: Vec<ContractData>,
}

#[derive(Debug, Deserialize)]
struct ContractData {
    strike: Option<f64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<i64>,
}

impl YahooClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_chart(&self, ticker: &str, query: &[(&str, String)]) -> Result<ChartResult, GatewayError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!("GET {} {:?}", url, query);

        let resp = self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(GatewayError::RateLimited),
            StatusCode::NOT_FOUND => return Err(GatewayError::InvalidTicker(ticker.to_string())),
            _ => {}
        }

        let body = resp
            .json::<ChartResponse>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        if let Some(err) = body.chart.error {
            return Err(classify_chart_error(ticker, err));
        }

        body.chart.result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| GatewayError::BadResponse("missing chart result".into()))
    }

    async fn fetch_options(&self, ticker: &str, expiry: Option<NaiveDate>) -> Result<OptionChainData, GatewayError> {
        let url = format!("{}/v7/finance/options/{}", self.base_url, ticker);
        let mut request = self.client.get(&url);
        if let Some(expiry) = expiry {
            request = request.query(&[("date", expiry_timestamp(expiry).to_string())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GatewayError::BadResponse(format!("options HTTP {}", resp.status())));
        }

        let body = resp
            .json::<OptionsResponse>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        body.option_chain.result
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InvalidTicker(ticker.to_string()))
    }
}

#[async_trait]
impl MarketDataGateway for YahooClient {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, GatewayError> {
        let query = [
            ("period1", day_start_timestamp(start).to_string()),
            // period2 is exclusive
            ("period2", day_start_timestamp(end + chrono::Duration::days(1)).to_string()),
            ("interval", "1d".to_string()),
        ];
        let result = self.fetch_chart(ticker, &query).await?;
        let series = parse_price_series(&result)?;

        if series.is_empty() {
            return Err(GatewayError::DataUnavailable(format!(
                "no prices for {} between {} and {}",
                ticker, start, end
            )));
        }

        Ok(series)
    }

    async fn fetch_earnings_dates(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, GatewayError> {
        let query = [
            ("range", "max".to_string()),
            ("interval", "3mo".to_string()),
            ("events", "earn".to_string()),
        ];
        let result = self.fetch_chart(ticker, &query).await?;

        Ok(parse_earnings_dates(&result, Utc::now().date_naive(), limit))
    }

    async fn fetch_options_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, GatewayError> {
        let chain = self.fetch_options(ticker, None).await?;

        let mut expiries: Vec<NaiveDate> = chain.expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect();
        expiries.sort();
        expiries.dedup();

        Ok(expiries)
    }

    async fn fetch_options_open_interest(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OpenInterest, GatewayError> {
        let chain = self.fetch_options(ticker, Some(expiry)).await?;
        let oi = parse_open_interest(chain, expiry);

        if oi.is_empty() {
            return Err(GatewayError::OptionsUnavailable {
                ticker: ticker.to_string(),
                expiry,
            });
        }

        Ok(oi)
    }
}

fn classify_chart_error(ticker: &str, err: ChartError) -> GatewayError {
    match err.code.as_str() {
        "Not Found" => GatewayError::InvalidTicker(ticker.to_string()),
        _ => GatewayError::DataUnavailable(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )),
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

// Yahoo keys option expiries on midnight UTC of the expiry date
fn expiry_timestamp(expiry: NaiveDate) -> i64 {
    day_start_timestamp(expiry)
}

/// Bar timestamps are exchange-local session opens; shift by the exchange offset before taking the date.
fn local_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}

fn parse_price_series(result: &ChartResult) -> Result<Vec<PricePoint>, GatewayError> {
    let Some(quote) = result.indicators.as_ref().and_then(|i| i.quote.first()) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(result.timestamp.len());

    for (i, &ts) in result.timestamp.iter().enumerate() {
        // skip bars without a close (halts, partial sessions)
        let Some(close) = quote.close.get(i).copied().flatten() else { continue };

        let date = local_date(ts, result.meta.gmtoffset)
            .ok_or_else(|| GatewayError::Parse(format!("bad timestamp {}", ts)))?;

        out.push(PricePoint {
            date,
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
        });
    }

    // Ascending, one row per trading day (the live bar can repeat the last session)
    out.sort_by_key(|p| p.date);
    out.dedup_by_key(|p| p.date);

    Ok(out)
}

/// Most recent `limit` announcements that have already happened, newest first.
fn parse_earnings_dates(result: &ChartResult, today: NaiveDate, limit: usize) -> Vec<NaiveDate> {
    let Some(events) = &result.events else {
        return Vec::new();
    };

    let mut dates: Vec<NaiveDate> = events.earnings
        .values()
        .filter_map(|e| local_date(e.date, result.meta.gmtoffset))
        .filter(|d| *d <= today)
        .collect();

    dates.sort_by(|a, b| b.cmp(a));
    dates.dedup();
    dates.truncate(limit);
    dates
}

fn parse_open_interest(chain: OptionChainData, expiry: NaiveDate) -> OpenInterest {
    let mut oi = OpenInterest::new(expiry);

    if let Some(options) = chain.options.into_iter().next() {
        for call in options.calls {
            if let (Some(strike), Some(n)) = (call.strike, call.open_interest) {
                *oi.calls.entry(StrikeKey::from_price(strike)).or_insert(0) += n.max(0) as u64;
            }
        }
        for put in options.puts {
            if let (Some(strike), Some(n)) = (put.strike, put.open_interest) {
                *oi.puts.entry(StrikeKey::from_price(strike)).or_insert(0) += n.max(0) as u64;
            }
        }
    }

    oi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(json: &str) -> ChartResult {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        resp.chart.result.unwrap().pop().unwrap()
    }

    #[test]
    fn test_parse_price_series_skips_missing_closes_and_dedups() {
        // 2024-03-04 and 2024-03-05 14:30 UTC, gmtoffset -18000 (New York, EST)
        let result = chart(r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1709562600,1709649000,1709735400,1709735460],
            "indicators":{"quote":[{
                "open":[10.0,11.0,null,12.5],
                "high":[10.5,11.5,null,12.9],
                "low":[9.5,10.5,null,12.1],
                "close":[10.2,null,12.0,12.4]
            }]}
        }],"error":null}}"#);

        let series = parse_price_series(&result).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(series[1].date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert!((series[0].close - 10.2).abs() < 1e-9);
        // missing open falls back to close
        assert!((series[1].open - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_earnings_dates_drops_future_and_orders_newest_first() {
        let result = chart(r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "timestamp":[],
            "events":{"earnings":{
                "1706745600":{"date":1706745600},
                "1714521600":{"date":1714521600},
                "1722470400":{"date":1722470400},
                "1730419200":{"date":1730419200}
            }}
        }],"error":null}}"#);
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();

        let dates = parse_earnings_dates(&result, today, 2);

        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_open_interest_skips_contracts_without_data() {
        let resp: OptionsResponse = serde_json::from_str(r#"{"optionChain":{"result":[{
            "expirationDates":[1718928000],
            "options":[{
                "calls":[{"strike":100.0,"openInterest":1200},{"strike":105.0}],
                "puts":[{"strike":95.0,"openInterest":800},{"strike":100.0,"openInterest":300}]
            }]
        }]}}"#).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

        let oi = parse_open_interest(resp.option_chain.result.into_iter().next().unwrap(), expiry);

        assert_eq!(oi.calls.len(), 1);
        assert_eq!(oi.calls[&StrikeKey::from_price(100.0)], 1200);
        assert_eq!(oi.puts[&StrikeKey::from_price(95.0)], 800);
        assert_eq!(oi.puts[&StrikeKey::from_price(100.0)], 300);
    }

    #[test]
    fn test_chart_error_not_found_is_invalid_ticker() {
        let resp: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        ).unwrap();
        let err = classify_chart_error("ZZZZ", resp.chart.error.unwrap());
        assert!(matches!(err, GatewayError::InvalidTicker(ref t) if t == "ZZZZ"));
        assert!(err.is_ticker_level());
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_price_history_live() {
        let client = YahooClient::new(&ProviderConfig::default()).unwrap();
        let end = Utc::now().date_naive();
        let start = end - chrono::Duration::days(30);
        let series = client.fetch_price_history("AAPL", start, end).await.unwrap();

        assert!(!series.is_empty());
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }
}
