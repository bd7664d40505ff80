use crate::config::{ExchangeConfig, ScreenerConfig};
use crate::error::ScreenerError;
use crate::models::{OptionChainSnapshot, Side, Signal};
use crate::notifier::SignalNotifier;
use crate::nse_client;
use crate::rules::{self, ChainStats, ThresholdPolicy};
use crate::session;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Screening result for one symbol in one cycle
#[derive(Debug, Clone, Serialize)]
pub struct SymbolSignals {
    pub symbol: String,
    pub expiry: String,
    pub strategy: String,
    pub policy: ThresholdPolicy,
    pub call_stats: ChainStats,
    pub put_stats: ChainStats,
    pub signals: Vec<Signal>,
}

/// Run the strategy on both sides of a snapshot.
///
/// Calls come first, then puts. Each signal gets its side from the row-set it
/// was screened in.
pub fn assemble_signals(
    symbol: &str,
    snapshot: &OptionChainSnapshot,
    strategy: &str,
    policy: ThresholdPolicy,
    generated_at: DateTime<Local>,
) -> Vec<Signal> {
    let calls = rules::apply_named_strategy(&snapshot.calls, strategy, policy);
    let puts = rules::apply_named_strategy(&snapshot.puts, strategy, policy);

    calls
        .into_iter()
        .map(|row| (Side::Call, row))
        .chain(puts.into_iter().map(|row| (Side::Put, row)))
        .map(|(side, row)| Signal::new(symbol, side, row, &snapshot.expiry, generated_at))
        .collect()
}

/// Warm up, fetch and screen one symbol
pub async fn screen_symbol(
    exchange: &ExchangeConfig,
    symbol: &str,
    strategy: &str,
    policy: ThresholdPolicy,
) -> Result<SymbolSignals, ScreenerError> {
    let session = session::acquire_session(exchange).await?;
    let snapshot = nse_client::fetch_option_chain(symbol, &session)
        .await?
        .with_symbol(symbol);

    let call_stats = ChainStats::from_rows(&snapshot.calls);
    let put_stats = ChainStats::from_rows(&snapshot.puts);
    let signals = assemble_signals(symbol, &snapshot, strategy, policy, Local::now());

    info!(
        symbol,
        expiry = %snapshot.expiry,
        ce_rows = call_stats.rows,
        ce_avg_oi = call_stats.avg_change_in_oi,
        ce_avg_vol = call_stats.avg_volume,
        pe_rows = put_stats.rows,
        pe_avg_oi = put_stats.avg_change_in_oi,
        pe_avg_vol = put_stats.avg_volume,
        signals = signals.len(),
        "screened option chain"
    );

    Ok(SymbolSignals {
        symbol: symbol.to_string(),
        expiry: snapshot.expiry,
        strategy: strategy.to_string(),
        policy,
        call_stats,
        put_stats,
        signals,
    })
}

// -----------------------------------------------
// POLL CYCLE
// -----------------------------------------------

/// Outcome of one symbol in a cycle
#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: String,
    pub outcome: Result<SymbolSignals, ScreenerError>,
    pub notify_failures: usize,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub symbols: Vec<SymbolReport>,
}

impl CycleReport {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.symbols
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok())
            .flat_map(|s| s.signals.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ScreenerError)> {
        self.symbols
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.symbol.as_str(), e)))
    }

    pub fn successful(&self) -> usize {
        self.symbols.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn notify_failures(&self) -> usize {
        self.symbols.iter().map(|r| r.notify_failures).sum()
    }
}

/// Polls every configured symbol and forwards fired signals to a notifier
pub struct Screener {
    config: Arc<ScreenerConfig>,
    notifier: Arc<dyn SignalNotifier>,
}

impl Screener {
    pub fn new(config: ScreenerConfig, notifier: Arc<dyn SignalNotifier>) -> Self {
        Self {
            config: Arc::new(config),
            notifier,
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// One full cycle. Every symbol is screened from scratch in its own task;
    /// a failing symbol never stops the others.
    pub async fn run_cycle(&self) -> CycleReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(self.config.symbols.len());

        for symbol in self.config.symbols.iter().cloned() {
            let config = Arc::clone(&self.config);
            let notifier = Arc::clone(&self.notifier);
            let sem = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return SymbolReport {
                            symbol,
                            outcome: Err(ScreenerError::Task(format!("semaphore closed: {}", e))),
                            notify_failures: 0,
                        };
                    }
                };
                process_symbol(&config, notifier.as_ref(), symbol).await
            });
            handles.push(handle);
        }

        let mut report = CycleReport::default();
        for (symbol, handle) in self.config.symbols.iter().zip(handles) {
            let symbol_report = match handle.await {
                Ok(res) => res,
                Err(e) => SymbolReport {
                    symbol: symbol.clone(),
                    outcome: Err(ScreenerError::Task(e.to_string())),
                    notify_failures: 0,
                },
            };
            report.symbols.push(symbol_report);
        }

        report
    }
}

async fn process_symbol(config: &ScreenerConfig, notifier: &dyn SignalNotifier, symbol: String) -> SymbolReport {
    let outcome = screen_symbol(&config.exchange, &symbol, &config.strategy, config.policy).await;

    let mut notify_failures = 0;
    match &outcome {
        Ok(screened) => {
            for signal in &screened.signals {
                if let Err(e) = notifier.notify(signal).await {
                    notify_failures += 1;
                    warn!(symbol = %symbol, strike = signal.row.strike_price, error = %e, "failed to deliver signal");
                }
            }
        }
        Err(e) => warn!(symbol = %symbol, error = %e, "symbol skipped this cycle"),
    }

    SymbolReport {
        symbol,
        outcome,
        notify_failures,
    }
}
