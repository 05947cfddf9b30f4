use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};
use crate::analysis::options::{select_expiry, OpenInterestTable};
use crate::analysis::reaction::{align_with_skips, normalize_events, Alignment};
use crate::analysis::stats::{expected_range, summarize};
use crate::analysis::types::{ExpectedRange, SummaryStats};
use crate::config::AnalysisConfig;
use crate::data::gateway::{GatewayError, MarketDataGateway};
use crate::data::types::PricePoint;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid ticker symbol: {0:?}")]
    InvalidTicker(String),

    #[error("no data for {ticker}: {source}")]
    TickerUnavailable {
        ticker: String,
        #[source]
        source: GatewayError,
    },
}

/// Everything shown for one ticker. Built fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub ticker: String,
    pub last_close: f64,
    pub earnings: EarningsSection,
    pub stats: SummaryStats,
    pub range_1d: Option<ExpectedRange>,
    pub range_7d: Option<ExpectedRange>,
    pub chart: Vec<PricePoint>,
    pub options: OptionsSection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EarningsSection {
    Analyzed(Alignment),
    /// Ticker resolved but none of its announcements could be aligned
    NoEarningsData { events_seen: usize },
}

impl EarningsSection {
    pub fn alignment(&self) -> Option<&Alignment> {
        match self {
            EarningsSection::Analyzed(alignment) => Some(alignment),
            EarningsSection::NoEarningsData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptionsSection {
    Available(OpenInterestTable),
    Unavailable {
        expiry: Option<NaiveDate>,
        reason: String,
    },
}

/// Uppercase and validate a user-entered symbol (e.g. "brk-b" -> "BRK-B", "^gspc")
pub fn normalize_ticker(input: &str) -> Result<String, DashboardError> {
    static TICKER_RE: OnceLock<Regex> = OnceLock::new();
    let re = TICKER_RE.get_or_init(|| {
        Regex::new(r"^[A-Z0-9.\-^=]{1,12}$").expect("ticker pattern is valid")
    });

    let ticker = input.trim().to_uppercase();
    if re.is_match(&ticker) {
        Ok(ticker)
    } else {
        Err(DashboardError::InvalidTicker(input.to_string()))
    }
}

pub struct DashboardBuilder<G> {
    gateway: G,
    config: AnalysisConfig,
}

impl<G: MarketDataGateway> DashboardBuilder<G> {
    pub fn new(gateway: G, config: AnalysisConfig) -> Self {
        Self { gateway, config }
    }

    /// Fetch, align and summarize one ticker as of `today`.
    ///
    /// Failing to get prices or earnings dates fails the whole request. Options
    /// problems only degrade the options section.
    pub async fn build(
        &self,
        input: &str,
        expiry: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Dashboard, DashboardError> {
        let ticker = normalize_ticker(input)?;
        let start = today - Duration::weeks(self.config.lookback_weeks);

        info!("Fetching {} prices {}..{} and last {} earnings dates", ticker, start, today, self.config.earnings_limit);

        let (series, earnings_dates) = futures::try_join!(
            self.gateway.fetch_price_history(&ticker, start, today),
            self.gateway.fetch_earnings_dates(&ticker, self.config.earnings_limit),
        )
        .map_err(|source| DashboardError::TickerUnavailable {
            ticker: ticker.clone(),
            source,
        })?;

        let Some(last) = series.last() else {
            return Err(DashboardError::TickerUnavailable {
                ticker: ticker.clone(),
                source: GatewayError::DataUnavailable("empty price series".into()),
            });
        };
        let last_close = last.close;

        let events = normalize_events(&earnings_dates);
        let alignment = align_with_skips(&series, &events);

        info!(
            "{}: {} earnings events, {} aligned, {} skipped ({} insufficient price history)",
            ticker,
            events.len(),
            alignment.records.len(),
            alignment.skipped.len(),
            alignment.skipped.iter().filter(|s| s.reason.is_insufficient_history()).count()
        );

        let stats = summarize(&alignment.records);
        let earnings = if alignment.records.is_empty() {
            warn!("{}: no usable earnings events in window", ticker);
            EarningsSection::NoEarningsData { events_seen: events.len() }
        } else {
            EarningsSection::Analyzed(alignment)
        };

        let chart_start = series.len().saturating_sub(self.config.chart_days);
        let chart = series[chart_start..].to_vec();

        let options = self.options_section(&ticker, expiry, today).await;

        Ok(Dashboard {
            ticker,
            last_close,
            earnings,
            range_1d: expected_range(last_close, stats.stdev_1d),
            range_7d: expected_range(last_close, stats.stdev_7d),
            stats,
            chart,
            options,
        })
    }

    async fn options_section(
        &self,
        ticker: &str,
        requested: Option<NaiveDate>,
        today: NaiveDate,
    ) -> OptionsSection {
        let expiries = match self.gateway.fetch_options_expiries(ticker).await {
            Ok(expiries) => expiries,
            Err(e) => {
                warn!("{}: options expiries unavailable: {}", ticker, e);
                return OptionsSection::Unavailable {
                    expiry: requested,
                    reason: e.to_string(),
                };
            }
        };

        let Some(expiry) = select_expiry(&expiries, requested, today) else {
            let reason = match requested {
                Some(e) => format!("{} is not a listed expiry", e),
                None => "no upcoming expiries".to_string(),
            };
            return OptionsSection::Unavailable {
                expiry: requested,
                reason,
            };
        };

        match self.gateway.fetch_options_open_interest(ticker, expiry).await {
            Ok(oi) => OptionsSection::Available(OpenInterestTable::from_open_interest(&oi)),
            Err(e) => {
                warn!("{}: no open interest for {}: {}", ticker, expiry, e);
                OptionsSection::Unavailable {
                    expiry: Some(expiry),
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::gateway::testing::{open_interest, series_from_closes, StaticGateway};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// 60 weekday rows from 2024-01-01, closes 100, 101, ... with a jump after row 20
    fn gateway() -> StaticGateway {
        let closes: Vec<f64> = (0..60)
            .map(|i| if i > 20 { 120.0 + i as f64 } else { 100.0 + i as f64 })
            .collect();
        let mut gw = StaticGateway::new("AAPL");
        gw.prices = series_from_closes(&closes);
        gw.earnings = vec![gw.prices[20].date, gw.prices[5].date, gw.prices[59].date];
        gw.expiries = vec![d(2024, 3, 22), d(2024, 4, 19)];
        gw.open_interest = vec![open_interest(d(2024, 3, 22), &[(150.0, 10)], &[(140.0, 7)])];
        gw
    }

    fn today() -> NaiveDate {
        d(2024, 3, 22)
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            chart_days: 10,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert!(matches!(normalize_ticker(""), Err(DashboardError::InvalidTicker(_))));
        assert!(normalize_ticker("AAPL; DROP").is_err());
        assert!(normalize_ticker("TOOLONGTICKER1").is_err());
    }

    #[tokio::test]
    async fn test_build_aligns_and_summarizes() {
        let builder = DashboardBuilder::new(gateway(), config());

        let dash = builder.build("aapl", None, today()).await.unwrap();

        assert_eq!(dash.ticker, "AAPL");
        assert_eq!(dash.last_close, 179.0);
        let alignment = dash.earnings.alignment().unwrap();
        // last-row event is skipped, the other two are kept in date order
        assert_eq!(alignment.records.len(), 2);
        assert_eq!(alignment.skipped.len(), 1);
        assert!(alignment.records[0].event_date < alignment.records[1].event_date);
        assert_eq!(dash.stats.samples_1d, 2);
        assert!(dash.range_1d.is_some());
        assert_eq!(dash.chart.len(), 10);
        assert_eq!(dash.chart.last().unwrap().close, 179.0);
        assert!(matches!(dash.options, OptionsSection::Available(ref t) if t.expiry == d(2024, 3, 22)));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_a_top_level_failure() {
        let builder = DashboardBuilder::new(gateway(), config());

        let err = builder.build("MSFT", None, today()).await.unwrap_err();

        assert!(matches!(
            err,
            DashboardError::TickerUnavailable { source: GatewayError::InvalidTicker(_), .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_reaches_gateway() {
        let builder = DashboardBuilder::new(gateway(), config());

        assert!(matches!(
            builder.build("not a ticker", None, today()).await,
            Err(DashboardError::InvalidTicker(_))
        ));
        assert_eq!(builder.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_earnings_is_reported_not_failed() {
        let mut gw = gateway();
        gw.earnings.clear();
        let builder = DashboardBuilder::new(gw, config());

        let dash = builder.build("AAPL", None, today()).await.unwrap();

        assert!(matches!(dash.earnings, EarningsSection::NoEarningsData { events_seen: 0 }));
        assert_eq!(dash.stats.mean_1d, None);
        assert_eq!(dash.range_1d, None);
        assert_eq!(dash.range_7d, None);
    }

    #[tokio::test]
    async fn test_missing_open_interest_degrades_only_options() {
        let builder = DashboardBuilder::new(gateway(), config());

        let dash = builder.build("AAPL", Some(d(2024, 4, 19)), today()).await.unwrap();

        assert!(dash.earnings.alignment().is_some());
        match dash.options {
            OptionsSection::Unavailable { expiry, .. } => assert_eq!(expiry, Some(d(2024, 4, 19))),
            other => panic!("expected unavailable options, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unlisted_expiry_is_unavailable() {
        let builder = DashboardBuilder::new(gateway(), config());

        let dash = builder.build("AAPL", Some(d(2024, 5, 17)), today()).await.unwrap();

        assert!(matches!(
            dash.options,
            OptionsSection::Unavailable { ref reason, .. } if reason.contains("not a listed expiry")
        ));
    }
}
