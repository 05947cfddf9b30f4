use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use crate::data::types::{OpenInterest, PricePoint};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no data for ticker {0}")]
    InvalidTicker(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("no open interest for {ticker} expiring {expiry}")]
    OptionsUnavailable { ticker: String, expiry: NaiveDate },

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

impl GatewayError {
    /// True when retrying with the same ticker cannot help.
    pub fn is_ticker_level(&self) -> bool {
        matches!(self, GatewayError::InvalidTicker(_) | GatewayError::DataUnavailable(_))
    }
}

/// Source of prices, earnings dates and options open interest for one ticker.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, GatewayError>;

    /// Past announcement dates, at most `limit`. Order is whatever the provider returns.
    async fn fetch_earnings_dates(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, GatewayError>;

    async fn fetch_options_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, GatewayError>;

    async fn fetch_options_open_interest(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OpenInterest, GatewayError>;
}
