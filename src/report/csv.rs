use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::analysis::options::OpenInterestTable;
use crate::analysis::types::ReactionRecord;

/// Writes the raw dashboard tables as CSV files under one directory
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

        Ok(Self { dir })
    }

    /// Reaction table, most recent first. Missing 7-day values are empty cells.
    pub fn export_reactions(&self, ticker: &str, records: &[ReactionRecord]) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}_earnings.csv", sanitize(ticker)));
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        writeln!(
            file,
            "date,close_before,close_after_1d,pct_change_1d,close_after_7d,pct_change_7d"
        )?;

        for r in records.iter().rev() {
            let after_7d = r.close_after_7d.map(|v| format!("{:.4}", v)).unwrap_or_default();
            let pct_7d = r.pct_change_7d.map(|v| format!("{:.4}", v)).unwrap_or_default();

            writeln!(
                file,
                "{},{:.4},{:.4},{:.4},{},{}",
                r.event_date,
                r.close_before,
                r.close_after_1d,
                r.pct_change_1d,
                after_7d,
                pct_7d
            )?;
        }

        info!("Wrote {} reaction rows to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn export_open_interest(&self, ticker: &str, table: &OpenInterestTable) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}_oi_{}.csv", sanitize(ticker), table.expiry));
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        writeln!(file, "strike,call_open_interest,put_open_interest,total")?;
        for row in &table.rows {
            writeln!(file, "{:.2},{},{},{}", row.strike, row.calls, row.puts, row.total())?;
        }

        info!("Wrote {} strikes to {}", table.rows.len(), path.display());
        Ok(path)
    }
}

// Index symbols like ^GSPC are not friendly file names
fn sanitize(ticker: &str) -> String {
    ticker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
