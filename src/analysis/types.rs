use chrono::NaiveDate;
use serde::Serialize;

/// Price reaction around one earnings announcement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionRecord {
    pub event_date: NaiveDate,
    pub close_before: f64,
    pub close_after_1d: f64,
    pub pct_change_1d: f64,
    /// Close 7 trading days after the event row; absent near the end of the series
    pub close_after_7d: Option<f64>,
    pub pct_change_7d: Option<f64>,
}

/// Mean and sample standard deviation of the reaction moves, in percent.
/// `None` means there was no data to compute from, which is not the same as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean_1d: Option<f64>,
    pub stdev_1d: Option<f64>,
    pub mean_7d: Option<f64>,
    pub stdev_7d: Option<f64>,
    pub samples_1d: usize,
    pub samples_7d: usize,
}

impl SummaryStats {
    /// Average 7D move minus average 1D move
    pub fn mean_delta(&self) -> Option<f64> {
        Some(self.mean_7d? - self.mean_1d?)
    }

    pub fn stdev_delta(&self) -> Option<f64> {
        Some(self.stdev_7d? - self.stdev_1d?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Horizon {
    OneDay,
    SevenDay,
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Horizon::OneDay => write!(f, "1D"),
            Horizon::SevenDay => write!(f, "7D"),
        }
    }
}

/// Why an earnings event produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum SkipReason {
    #[error("no trading day on {0}")]
    NoTradingDay(NaiveDate),

    #[error("no close before {0}")]
    NoPriorClose(NaiveDate),

    #[error("no close after {0}")]
    NoNextClose(NaiveDate),
}

impl SkipReason {
    /// Index underflow/overflow during alignment, as opposed to a date the series never had
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, SkipReason::NoPriorClose(_) | SkipReason::NoNextClose(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedEvent {
    pub event_date: NaiveDate,
    pub reason: SkipReason,
}
