use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use crate::config::CacheConfig;
use crate::data::gateway::{GatewayError, MarketDataGateway};
use crate::data::types::{OpenInterest, PricePoint};

/// TTL cache with evict-on-read
pub struct ResponseCache<V> {
    cache: DashMap<String, CachedEntry<V>>,
    ttl: Duration,
}

struct CachedEntry<V> {
    value: V,
    timestamp: Instant,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, key: String, value: V) {
        self.cache.insert(key, CachedEntry {
            value,
            timestamp: Instant::now(),
        });
    }

    /// Get value if not expired
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.cache.get(key)?;
        if entry.timestamp.elapsed() > self.ttl {
            drop(entry); // Drop the read lock
            self.cache.remove(key);
            None
        } else {
            Some(entry.value.clone())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Gateway decorator that memoizes successful responses per request.
/// Errors are never cached.
pub struct CachedGateway<G> {
    inner: G,
    prices: ResponseCache<Vec<PricePoint>>,
    earnings: ResponseCache<Vec<NaiveDate>>,
    expiries: ResponseCache<Vec<NaiveDate>>,
    open_interest: ResponseCache<OpenInterest>,
}

impl<G: MarketDataGateway> CachedGateway<G> {
    pub fn new(inner: G, config: &CacheConfig) -> Self {
        let options_ttl = Duration::from_secs(config.options_ttl_secs);
        Self {
            inner,
            prices: ResponseCache::new(Duration::from_secs(config.price_ttl_secs)),
            earnings: ResponseCache::new(Duration::from_secs(config.earnings_ttl_secs)),
            expiries: ResponseCache::new(options_ttl),
            open_interest: ResponseCache::new(options_ttl),
        }
    }
}

#[async_trait]
impl<G: MarketDataGateway> MarketDataGateway for CachedGateway<G> {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, GatewayError> {
        let key = format!("{}:{}:{}", ticker, start, end);
        if let Some(hit) = self.prices.get(&key) {
            debug!("cache hit: prices {}", key);
            return Ok(hit);
        }
        let series = self.inner.fetch_price_history(ticker, start, end).await?;
        self.prices.insert(key, series.clone());
        Ok(series)
    }

    async fn fetch_earnings_dates(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, GatewayError> {
        let key = format!("{}:{}", ticker, limit);
        if let Some(hit) = self.earnings.get(&key) {
            debug!("cache hit: earnings {}", key);
            return Ok(hit);
        }
        let dates = self.inner.fetch_earnings_dates(ticker, limit).await?;
        self.earnings.insert(key, dates.clone());
        Ok(dates)
    }

    async fn fetch_options_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, GatewayError> {
        if let Some(hit) = self.expiries.get(ticker) {
            return Ok(hit);
        }
        let expiries = self.inner.fetch_options_expiries(ticker).await?;
        self.expiries.insert(ticker.to_string(), expiries.clone());
        Ok(expiries)
    }

    async fn fetch_options_open_interest(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OpenInterest, GatewayError> {
        let key = format!("{}:{}", ticker, expiry);
        if let Some(hit) = self.open_interest.get(&key) {
            return Ok(hit);
        }
        let oi = self.inner.fetch_options_open_interest(ticker, expiry).await?;
        self.open_interest.insert(key, oi.clone());
        Ok(oi)
    }
}
