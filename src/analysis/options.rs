use chrono::NaiveDate;
use serde::Serialize;
use crate::data::types::OpenInterest;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpenInterestRow {
    pub strike: f64,
    pub calls: u64,
    pub puts: u64,
}

impl OpenInterestRow {
    pub fn total(&self) -> u64 {
        self.calls + self.puts
    }
}

/// Call and put open interest joined on strike, ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenInterestTable {
    pub expiry: NaiveDate,
    pub rows: Vec<OpenInterestRow>,
}

impl OpenInterestTable {
    /// Outer join of the two maps; a strike missing on one side counts as zero there.
    pub fn from_open_interest(oi: &OpenInterest) -> Self {
        let mut strikes: Vec<_> = oi.calls.keys().chain(oi.puts.keys()).copied().collect();
        strikes.sort();
        strikes.dedup();

        let rows = strikes
            .into_iter()
            .map(|strike| OpenInterestRow {
                strike: strike.price(),
                calls: oi.calls.get(&strike).copied().unwrap_or(0),
                puts: oi.puts.get(&strike).copied().unwrap_or(0),
            })
            .collect();

        Self { expiry: oi.expiry, rows }
    }

    /// Strike with the most contracts outstanding
    pub fn peak_strike(&self) -> Option<&OpenInterestRow> {
        self.rows.iter().max_by_key(|r| r.total())
    }
}

/// Requested expiry if listed, otherwise the nearest one on or after `today`
pub fn select_expiry(
    expiries: &[NaiveDate],
    requested: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    match requested {
        Some(expiry) => expiries.contains(&expiry).then_some(expiry),
        None => expiries.iter().copied().filter(|e| *e >= today).min(),
    }
}
