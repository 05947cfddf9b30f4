use crate::analysis::types::{ExpectedRange, ReactionRecord, SummaryStats};

/// Aggregate the reaction moves.
///
/// Standard deviation is the sample estimate (n - 1 denominator), so a single
/// sample yields a mean but no standard deviation. The 7-day fields only
/// consider records that have a 7-day move.
pub fn summarize(records: &[ReactionRecord]) -> SummaryStats {
    let moves_1d: Vec<f64> = records.iter().map(|r| r.pct_change_1d).collect();
    let moves_7d: Vec<f64> = records.iter().filter_map(|r| r.pct_change_7d).collect();

    SummaryStats {
        mean_1d: mean(&moves_1d),
        stdev_1d: sample_stdev(&moves_1d),
        mean_7d: mean(&moves_7d),
        stdev_7d: sample_stdev(&moves_7d),
        samples_1d: moves_1d.len(),
        samples_7d: moves_7d.len(),
    }
}

/// One standard deviation band around `last_close`. `None` stdev propagates.
pub fn expected_range(last_close: f64, stdev_pct: Option<f64>) -> Option<ExpectedRange> {
    let stdev_pct = stdev_pct?;
    Some(ExpectedRange {
        low: last_close * (1.0 - stdev_pct / 100.0),
        high: last_close * (1.0 + stdev_pct / 100.0),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
