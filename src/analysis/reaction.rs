use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use crate::analysis::types::{ReactionRecord, SkipReason, SkippedEvent};
use crate::data::types::{EarningsEvent, PricePoint};

/// Lookahead for the second reaction window, counted in trading days (series rows), not calendar days
pub const TRADING_DAYS_AFTER: usize = 7;

/// Result of aligning earnings events against a price series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alignment {
    pub records: Vec<ReactionRecord>,
    pub skipped: Vec<SkippedEvent>,
}

/// Sort chronologically and drop duplicate dates
pub fn normalize_events(dates: &[NaiveDate]) -> Vec<EarningsEvent> {
    let mut events: Vec<EarningsEvent> = dates.iter().copied().map(EarningsEvent::new).collect();
    events.sort();
    events.dedup();
    events
}

/// Reaction records for every usable event, oldest first.
///
/// `series` must be ascending by date with one row per trading day. Events are
/// accepted in any order. An event is skipped when its date is not a row in the
/// series, or when it sits on the first or last row (no close before / after).
/// The 7-day fields are left empty when `idx + 7` runs past the series.
pub fn align(series: &[PricePoint], events: &[EarningsEvent]) -> Vec<ReactionRecord> {
    align_with_skips(series, events).records
}

pub fn align_with_skips(series: &[PricePoint], events: &[EarningsEvent]) -> Alignment {
    let mut ordered = events.to_vec();
    ordered.sort();
    ordered.dedup();

    let mut alignment = Alignment::default();

    for event in ordered {
        match reaction_at(series, event.announcement_date) {
            Ok(record) => alignment.records.push(record),
            Err(reason) => {
                debug!("Skipping earnings event: {}", reason);
                alignment.skipped.push(SkippedEvent {
                    event_date: event.announcement_date,
                    reason,
                });
            }
        }
    }

    alignment
}

fn reaction_at(series: &[PricePoint], date: NaiveDate) -> Result<ReactionRecord, SkipReason> {
    let idx = series
        .binary_search_by_key(&date, |p| p.date)
        .map_err(|_| SkipReason::NoTradingDay(date))?;

    let prior = idx.checked_sub(1).ok_or(SkipReason::NoPriorClose(date))?;
    let close_before = series[prior].close;

    let close_after_1d = series
        .get(idx + 1)
        .map(|p| p.close)
        .ok_or(SkipReason::NoNextClose(date))?;

    let close_after_7d = series.get(idx + TRADING_DAYS_AFTER).map(|p| p.close);

    Ok(ReactionRecord {
        event_date: date,
        close_before,
        close_after_1d,
        pct_change_1d: pct_change(close_before, close_after_1d),
        close_after_7d,
        pct_change_7d: close_after_7d.map(|after| pct_change(close_before, after)),
    })
}

fn pct_change(before: f64, after: f64) -> f64 {
    100.0 * (after - before) / before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::gateway::testing::series_from_closes;

    fn scenario_series() -> Vec<PricePoint> {
        series_from_closes(&[10.0, 10.0, 11.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 12.0])
    }

    fn event_at(series: &[PricePoint], idx: usize) -> EarningsEvent {
        EarningsEvent::new(series[idx].date)
    }

    #[test]
    fn test_reaction_uses_prior_next_and_seventh_trading_day() {
        let series = scenario_series();
        let records = align(&series, &[event_at(&series, 2)]);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.event_date, series[2].date);
        assert_eq!(r.close_before, 10.0);
        assert_eq!(r.close_after_1d, 9.0);
        assert!((r.pct_change_1d - -10.0).abs() < 1e-9);
        // idx 2 + 7 = row 9, not the 12.0 on row 10
        assert_eq!(r.close_after_7d, Some(9.0));
        assert!((r.pct_change_7d.unwrap() - -10.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_on_last_row_is_skipped() {
        let series = scenario_series();
        let alignment = align_with_skips(&series, &[event_at(&series, series.len() - 1)]);

        assert!(alignment.records.is_empty());
        assert_eq!(alignment.skipped.len(), 1);
        assert!(matches!(alignment.skipped[0].reason, SkipReason::NoNextClose(_)));
        assert!(alignment.skipped[0].reason.is_insufficient_history());
    }

    #[test]
    fn test_event_on_first_row_is_skipped() {
        let series = scenario_series();
        let alignment = align_with_skips(&series, &[event_at(&series, 0)]);

        assert!(alignment.records.is_empty());
        assert!(matches!(alignment.skipped[0].reason, SkipReason::NoPriorClose(_)));
    }

    #[test]
    fn test_event_near_end_keeps_one_day_fields_only() {
        let series = scenario_series();
        let records = align(&series, &[event_at(&series, series.len() - 4)]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].close_after_7d, None);
        assert_eq!(records[0].pct_change_7d, None);
        assert_eq!(records[0].close_after_1d, 9.0);
    }

    #[test]
    fn test_exactly_seven_rows_ahead_is_in_range() {
        let series = scenario_series();
        // idx 3 + 7 = 10, the last row
        let records = align(&series, &[event_at(&series, 3)]);

        assert_eq!(records[0].close_after_7d, Some(12.0));
        assert!((records[0].pct_change_7d.unwrap() - 9.090_909).abs() < 1e-4);
    }

    #[test]
    fn test_non_trading_day_and_out_of_range_are_skipped() {
        let series = scenario_series();
        // 2024-01-06 is a Saturday inside the series; 2023-06-01 predates it
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let before_window = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();

        let alignment = align_with_skips(
            &series,
            &[EarningsEvent::new(saturday), EarningsEvent::new(before_window)],
        );

        assert!(alignment.records.is_empty());
        assert!(alignment.skipped.iter().all(|s| matches!(s.reason, SkipReason::NoTradingDay(_))));
        assert!(!alignment.skipped[0].reason.is_insufficient_history());
    }

    #[test]
    fn test_output_is_chronological_regardless_of_input_order() {
        let series = series_from_closes(&(1..=30).map(f64::from).collect::<Vec<_>>());
        let events = vec![event_at(&series, 20), event_at(&series, 5), event_at(&series, 12)];

        let records = align(&series, &events);

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.event_date).collect();
        assert_eq!(dates, vec![series[5].date, series[12].date, series[20].date]);
    }

    #[test]
    fn test_records_only_for_dates_in_series_and_seven_day_fields_paired() {
        let series = series_from_closes(&(0..40).map(|i| 50.0 + (i % 7) as f64).collect::<Vec<_>>());
        let mut dates: Vec<NaiveDate> = series.iter().step_by(3).map(|p| p.date).collect();
        dates.push(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()); // Sunday
        let events = normalize_events(&dates);

        let records = align(&series, &events);

        assert!(!records.is_empty());
        for r in &records {
            assert!(series.iter().any(|p| p.date == r.event_date));
            assert_eq!(r.close_after_7d.is_some(), r.pct_change_7d.is_some());
        }
    }

    #[test]
    fn test_align_is_idempotent() {
        let series = scenario_series();
        let events = normalize_events(&[series[2].date, series[5].date, series[9].date]);

        assert_eq!(align(&series, &events), align(&series, &events));
    }

    #[test]
    fn test_normalize_events_sorts_and_dedups() {
        let a = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();

        let events = normalize_events(&[b, a, b]);

        assert_eq!(events, vec![EarningsEvent::new(a), EarningsEvent::new(b)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(align(&[], &[EarningsEvent::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())]).is_empty());
        assert!(align(&scenario_series(), &[]).is_empty());
    }
}
