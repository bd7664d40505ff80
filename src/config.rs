use crate::error::ScreenerError;
use crate::rules::{StrategyKind, ThresholdPolicy};
use std::time::Duration;
use tracing::warn;

// -----------------------------------------------
// NSE API ENDPOINTS
// -----------------------------------------------
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

pub fn nse_option_chain_url(base_url: &str, symbol: &str) -> String {
    format!(
        "{}/api/option-chain-indices?symbol={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(symbol)
    )
}

// -----------------------------------------------
// INDICES TO POLL
// -----------------------------------------------
pub const DEFAULT_SYMBOLS: &[&str] = &["NIFTY", "BANKNIFTY", "FINNIFTY"];

// -----------------------------------------------
// BROWSER IDENTITY
// -----------------------------------------------
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
    "Mozilla/5.0 (X11; Linux x86_64)",
];

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const HEADER_ACCEPT_HTML: &str = "text/html";

// -----------------------------------------------
// TIMEOUTS
// -----------------------------------------------
pub const WARMUP_TIMEOUT: Duration = Duration::from_secs(5);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// RETRY CONFIG (data call only, off by default)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const DEFAULT_FETCH_RETRIES: usize = 0;
pub const MAX_FETCH_RETRIES: usize = 5;

// -----------------------------------------------
// CONCURRENCY
// -----------------------------------------------
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

// -----------------------------------------------
// SIGNALS
// -----------------------------------------------
pub const DEFAULT_STRATEGY: &str = "Breakout";

// -----------------------------------------------
// NOTIFIER
// -----------------------------------------------
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// BINARY
// -----------------------------------------------
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Where and how to talk to the exchange.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub warmup_timeout: Duration,
    pub fetch_timeout: Duration,
    pub fetch_retries: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: NSE_BASE_URL.to_string(),
            warmup_timeout: WARMUP_TIMEOUT,
            fetch_timeout: FETCH_TIMEOUT,
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }
}

impl ExchangeConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

/// Everything a poll cycle needs. Built once and handed to the screener.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub symbols: Vec<String>,
    pub strategy: String,
    pub policy: ThresholdPolicy,
    pub exchange: ExchangeConfig,
    pub telegram: Option<TelegramConfig>,
    pub max_concurrent: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            strategy: DEFAULT_STRATEGY.to_string(),
            policy: ThresholdPolicy::Relative,
            exchange: ExchangeConfig::default(),
            telegram: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl ScreenerConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ScreenerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreenerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let symbols = match non_empty("SCREENER_SYMBOLS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.symbols,
        };

        let strategy = non_empty("SCREENER_STRATEGY").unwrap_or(defaults.strategy);

        let policy = match non_empty("SCREENER_THRESHOLD_MODE") {
            Some(mode) => mode.parse::<ThresholdPolicy>()?,
            None => defaults.policy,
        };

        let mut exchange = ExchangeConfig::default();
        if let Some(url) = non_empty("SCREENER_EXCHANGE_URL") {
            exchange.base_url = url;
        }
        if let Some(val) = non_empty("SCREENER_FETCH_RETRIES") {
            let retries = val
                .parse::<usize>()
                .map_err(|e| ScreenerError::Config(format!("SCREENER_FETCH_RETRIES '{}': {}", val, e)))?;
            exchange.fetch_retries = retries.min(MAX_FETCH_RETRIES);
        }

        let max_concurrent = match non_empty("SCREENER_MAX_CONCURRENT") {
            Some(val) => val
                .parse::<usize>()
                .map_err(|e| ScreenerError::Config(format!("SCREENER_MAX_CONCURRENT '{}': {}", val, e)))?
                .clamp(1, 50),
            None => defaults.max_concurrent,
        };

        let telegram = match (non_empty("TELEGRAM_BOT_TOKEN"), non_empty("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                api_url: non_empty("SCREENER_TELEGRAM_API").unwrap_or_else(|| TELEGRAM_API_URL.to_string()),
                bot_token,
                chat_id,
            }),
            (None, None) => None,
            _ => {
                return Err(ScreenerError::Config(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
                ));
            }
        };

        let config = Self {
            symbols,
            strategy,
            policy,
            exchange,
            telegram,
            max_concurrent,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.symbols.is_empty() {
            return Err(ScreenerError::Config("no symbols to poll".to_string()));
        }
        if self.exchange.base_url.is_empty() {
            return Err(ScreenerError::Config("exchange base URL is empty".to_string()));
        }
        if StrategyKind::from_name(&self.strategy).is_none() {
            // Kept as-is: an unknown name screens to an empty result every cycle.
            warn!(strategy = %self.strategy, "unknown strategy name, no signals will be produced");
        }
        Ok(())
    }
}

/// Get the execution mode from environment or default to a single poll
pub fn get_execution_mode() -> String {
    std::env::var("SCREENER_MODE").unwrap_or_else(|_| "poll".to_string())
}

pub fn get_port() -> u16 {
    std::env::var("SCREENER_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn get_poll_interval() -> Duration {
    let secs = std::env::var("SCREENER_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    Duration::from_secs(secs)
}
