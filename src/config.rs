use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Trailing price window, in weeks
    #[serde(default = "default_lookback_weeks")]
    pub lookback_weeks: i64,
    #[serde(default = "default_earnings_limit")]
    pub earnings_limit: usize,
    /// Trading days shown in the chart window
    #[serde(default = "default_chart_days")]
    pub chart_days: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_price_ttl")]
    pub price_ttl_secs: u64,
    #[serde(default = "default_earnings_ttl")]
    pub earnings_ttl_secs: u64,
    #[serde(default = "default_options_ttl")]
    pub options_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub csv_export: bool,
    #[serde(default = "default_csv_dir")]
    pub csv_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_lookback_weeks() -> i64 { 52 * 4 }
fn default_earnings_limit() -> usize { 20 }
fn default_chart_days() -> usize { 100 }
fn default_base_url() -> String { "https://query1.finance.yahoo.com".to_string() }
fn default_request_timeout() -> u64 { 15 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_true() -> bool { true }
fn default_price_ttl() -> u64 { 3600 }
fn default_earnings_ttl() -> u64 { 3600 }
fn default_options_ttl() -> u64 { 300 }
fn default_csv_dir() -> String { "reports".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lookback_weeks: default_lookback_weeks(),
            earnings_limit: default_earnings_limit(),
            chart_days: default_chart_days(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price_ttl_secs: default_price_ttl(),
            earnings_ttl_secs: default_earnings_ttl(),
            options_ttl_secs: default_options_ttl(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            csv_export: false,
            csv_dir: default_csv_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub yahoo_base_url: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.yahoo_base_url {
            self.provider.base_url = url.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            config_path: std::env::var("EARNINGS_MOVE_CONFIG")
                .unwrap_or_else(|_| "config.toml".to_string()),
            yahoo_base_url: std::env::var("YAHOO_BASE_URL").ok(),
        })
    }
}
