use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One daily OHLC bar. A series of these is ascending by date, one row per trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub announcement_date: NaiveDate,
}

impl EarningsEvent {
    pub fn new(announcement_date: NaiveDate) -> Self {
        Self { announcement_date }
    }
}

/// Open interest for one expiry, keyed by strike in cents so the maps stay ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenInterest {
    pub expiry: NaiveDate,
    pub calls: BTreeMap<StrikeKey, u64>,
    pub puts: BTreeMap<StrikeKey, u64>,
}

impl OpenInterest {
    pub fn new(expiry: NaiveDate) -> Self {
        Self {
            expiry,
            calls: BTreeMap::new(),
            puts: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Strike price rounded to the cent. f64 is not `Ord`, so the maps key on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrikeKey(i64);

impl StrikeKey {
    pub fn from_price(strike: f64) -> Self {
        Self((strike * 100.0).round() as i64)
    }

    pub fn price(self) -> f64 {
        self.0 as f64 / 100.0
    }
}
