pub mod api_server_axum;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notifier;
pub mod nse_client;
pub mod processor;
pub mod rules;
pub mod session;

// Re-exports for convenience
pub use config::{ExchangeConfig, ScreenerConfig, TelegramConfig};
pub use error::ScreenerError;
pub use models::{OptionChainSnapshot, OptionRow, Side, Signal};
pub use notifier::{LogNotifier, SignalNotifier, TelegramNotifier};
pub use nse_client::{fetch_option_chain, fetch_option_chain_body, parse_option_chain};
pub use processor::{assemble_signals, screen_symbol, CycleReport, Screener, SymbolReport, SymbolSignals};
pub use rules::{apply_named_strategy, apply_strategy, ChainStats, StrategyKind, ThresholdPolicy};
pub use session::{acquire_session, Session};
