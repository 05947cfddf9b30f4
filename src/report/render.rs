use std::fmt::{self, Display, Formatter};
use crate::analysis::dashboard::{Dashboard, DashboardError, EarningsSection, OptionsSection};
use crate::analysis::types::{ExpectedRange, Horizon};

/// Candles printed under the chart summary
const CHART_TAIL_ROWS: usize = 10;

pub fn render_failure(err: &DashboardError) -> String {
    format!("❌ Unable to obtain data. Choose another ticker ({})\n", err)
}

pub fn render_dashboard(dash: &Dashboard) -> String {
    DashboardView(dash).to_string()
}

/// Plain-text dashboard: metrics, chart window with range bands, options, reaction table
pub struct DashboardView<'a>(pub &'a Dashboard);

impl Display for DashboardView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let dash = self.0;
        writeln!(f, "🟢 Showing earnings information for ${}", dash.ticker)?;
        writeln!(f)?;

        render_metrics(f, dash)?;
        render_chart(f, dash)?;
        render_options(f, &dash.options)?;
        render_reactions(f, &dash.earnings)
    }
}

fn render_metrics(f: &mut Formatter<'_>, dash: &Dashboard) -> fmt::Result {
    let s = &dash.stats;
    writeln!(f, "Average 1D Move: {}", pct(s.mean_1d))?;
    writeln!(f, "Average 7D Move: {} (Δ {})", pct(s.mean_7d), num(s.mean_delta()))?;
    writeln!(f, "StDev 1D Move:   {}", pct(s.stdev_1d))?;
    writeln!(f, "StDev 7D Move:   {} (Δ {})", pct(s.stdev_7d), num(s.stdev_delta()))?;
    writeln!(f, "Last close:      {:.2}", dash.last_close)?;
    writeln!(f, "Expected range {}: {}", Horizon::OneDay, range(dash.range_1d))?;
    writeln!(f, "Expected range {}: {}", Horizon::SevenDay, range(dash.range_7d))?;
    writeln!(f)
}

fn render_chart(f: &mut Formatter<'_>, dash: &Dashboard) -> fmt::Result {
    let (Some(first), Some(last)) = (dash.chart.first(), dash.chart.last()) else {
        return Ok(());
    };
    let high = dash.chart.iter().map(|p| p.high).fold(f64::MIN, f64::max);
    let low = dash.chart.iter().map(|p| p.low).fold(f64::MAX, f64::min);

    writeln!(
        f,
        "Chart: {} trading days {} → {}, low {:.2} high {:.2}",
        dash.chart.len(),
        first.date,
        last.date,
        low,
        high
    )?;
    for (horizon, band) in [(Horizon::OneDay, dash.range_1d), (Horizon::SevenDay, dash.range_7d)] {
        if let Some(band) = band {
            writeln!(f, "  {} band: {:.2} / {:.2}", horizon, band.low, band.high)?;
        }
    }

    writeln!(f, "  {:<10} {:>9} {:>9} {:>9} {:>9}", "Date", "Open", "High", "Low", "Close")?;
    let tail_start = dash.chart.len().saturating_sub(CHART_TAIL_ROWS);
    for p in &dash.chart[tail_start..] {
        writeln!(
            f,
            "  {:<10} {:>9.2} {:>9.2} {:>9.2} {:>9.2}{}",
            p.date,
            p.open,
            p.high,
            p.low,
            p.close,
            band_marker(p.close, dash.range_1d)
        )?;
    }
    writeln!(f)
}

fn band_marker(close: f64, band: Option<ExpectedRange>) -> &'static str {
    match band {
        Some(b) if close > b.high => " ▲",
        Some(b) if close < b.low => " ▼",
        _ => "",
    }
}

fn render_options(f: &mut Formatter<'_>, options: &OptionsSection) -> fmt::Result {
    match options {
        OptionsSection::Available(table) => {
            writeln!(f, "Open interest, expiry {}", table.expiry)?;
            let peak = table.peak_strike().map(|r| r.strike);
            writeln!(f, "  {:>10} {:>10} {:>10} {:>10}", "Strike", "Calls", "Puts", "Total")?;
            for row in &table.rows {
                let marker = if Some(row.strike) == peak { " *" } else { "" };
                writeln!(
                    f,
                    "  {:>10.2} {:>10} {:>10} {:>10}{}",
                    row.strike,
                    row.calls,
                    row.puts,
                    row.total(),
                    marker
                )?;
            }
        }
        OptionsSection::Unavailable { expiry, reason } => {
            match expiry {
                Some(e) => writeln!(f, "No options data for expiry {} ({})", e, reason)?,
                None => writeln!(f, "No options data ({})", reason)?,
            }
        }
    }
    writeln!(f)
}

fn render_reactions(f: &mut Formatter<'_>, earnings: &EarningsSection) -> fmt::Result {
    let alignment = match earnings {
        EarningsSection::Analyzed(alignment) => alignment,
        EarningsSection::NoEarningsData { events_seen } => {
            writeln!(f, "No earnings data ({} announcements, none in the price window)", events_seen)?;
            return Ok(());
        }
    };

    writeln!(
        f,
        "{:<10} {:>22} {:>21} {:>12} {:>24} {:>12}",
        "Date",
        "Close Before Earnings",
        "Close After Earnings",
        "+1D %Change",
        "Close 7D After Earnings",
        "+7D %Change"
    )?;
    // most recent first
    for r in alignment.records.iter().rev() {
        writeln!(
            f,
            "{:<10} {:>22.2} {:>21.2} {:>12.2} {:>24} {:>12}",
            r.event_date,
            r.close_before,
            r.close_after_1d,
            r.pct_change_1d,
            num(r.close_after_7d),
            num(r.pct_change_7d)
        )?;
    }
    for skipped in &alignment.skipped {
        writeln!(f, "  skipped {}: {}", skipped.event_date, skipped.reason)?;
    }
    Ok(())
}

fn pct(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}%", v)).unwrap_or_else(|| "n/a".to_string())
}

fn num(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn range(value: Option<ExpectedRange>) -> String {
    value
        .map(|r| format!("{:.2} – {:.2}", r.low, r.high))
        .unwrap_or_else(|| "n/a".to_string())
}
