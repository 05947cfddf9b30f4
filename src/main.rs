use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use earnings_move::analysis::dashboard::{DashboardBuilder, DashboardError, OptionsSection};
use earnings_move::config::{Config, EnvConfig};
use earnings_move::data::cache::CachedGateway;
use earnings_move::data::gateway::MarketDataGateway;
use earnings_move::data::yahoo::YahooClient;
use earnings_move::report::csv::CsvExporter;
use earnings_move::report::render::{render_dashboard, render_failure};

#[derive(Parser)]
#[command(name = "earnings-move")]
#[command(about = "Historical stock price reaction around earnings announcements")]
struct Cli {
    /// Ticker symbol, e.g. AAPL. Omit with --interactive.
    #[arg(value_name = "TICKER", required_unless_present = "interactive")]
    ticker: Option<String>,

    /// Options expiry for the open-interest table (defaults to the nearest)
    #[arg(long, value_name = "YYYY-MM-DD")]
    expiry: Option<NaiveDate>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Write the reaction and open-interest tables as CSV
    #[arg(long)]
    csv: bool,

    /// Print the dashboard as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Read one ticker per line from stdin, reusing cached provider data
    #[arg(short, long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let env_config = EnvConfig::load()?;
    let config_path = cli.config.clone().unwrap_or_else(|| env_config.config_path.clone());
    let mut config = Config::load_or_default(&config_path)?;
    config.apply_env(&env_config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.report.log_level)),
        )
        .init();

    tracing::info!("Provider: {}", config.provider.base_url);
    tracing::info!("Cache enabled: {}", config.cache.enabled);

    let client = YahooClient::new(&config.provider)?;
    if config.cache.enabled {
        let gateway = CachedGateway::new(client, &config.cache);
        run(gateway, &cli, &config).await
    } else {
        run(client, &cli, &config).await
    }
}

async fn run<G: MarketDataGateway>(gateway: G, cli: &Cli, config: &Config) -> Result<ExitCode> {
    let builder = DashboardBuilder::new(gateway, config.analysis.clone());
    let exporter = if cli.csv || config.report.csv_export {
        Some(CsvExporter::new(&config.report.csv_dir)?)
    } else {
        None
    };

    if !cli.interactive {
        let ticker = cli.ticker.as_deref().unwrap_or_default();
        let ok = show(&builder, exporter.as_ref(), ticker, cli).await?;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    println!("Input stock ticker (empty line or Ctrl-D to quit):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let ticker = line.trim();
        if ticker.is_empty() {
            break;
        }
        show(&builder, exporter.as_ref(), ticker, cli).await?;
    }

    tracing::info!("Shutting down...");
    Ok(ExitCode::SUCCESS)
}

/// Build and print one dashboard. Returns false when the ticker itself failed.
async fn show<G: MarketDataGateway>(
    builder: &DashboardBuilder<G>,
    exporter: Option<&CsvExporter>,
    ticker: &str,
    cli: &Cli,
) -> Result<bool> {
    let today = Utc::now().date_naive();

    let dash = match builder.build(ticker, cli.expiry, today).await {
        Ok(dash) => dash,
        Err(e) => {
            match &e {
                DashboardError::TickerUnavailable { source, .. } if !source.is_ticker_level() => {
                    tracing::error!("Provider failure: {}", e)
                }
                _ => tracing::warn!("{}", e),
            }
            print!("{}", render_failure(&e));
            return Ok(false);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
    } else {
        print!("{}", render_dashboard(&dash));
    }

    if let Some(exporter) = exporter {
        if let Some(alignment) = dash.earnings.alignment() {
            exporter.export_reactions(&dash.ticker, &alignment.records)?;
        }
        if let OptionsSection::Available(table) = &dash.options {
            exporter.export_open_interest(&dash.ticker, table)?;
        }
    }

    Ok(true)
}
