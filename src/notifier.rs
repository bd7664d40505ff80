use crate::config::{self, TelegramConfig};
use crate::error::ScreenerError;
use crate::models::Signal;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Sink for fired signals. Delivery is best effort: callers log failures and move on.
#[async_trait]
pub trait SignalNotifier: Send + Sync {
    async fn notify(&self, signal: &Signal) -> Result<(), ScreenerError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Posts `{chat_id, text}` to a Telegram bot's `sendMessage` method
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(telegram: &TelegramConfig) -> Result<Self, ScreenerError> {
        let client = Client::builder()
            .timeout(config::NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| ScreenerError::Notifier(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                telegram.api_url.trim_end_matches('/'),
                telegram.bot_token
            ),
            chat_id: telegram.chat_id.clone(),
        })
    }
}

#[async_trait]
impl SignalNotifier for TelegramNotifier {
    async fn notify(&self, signal: &Signal) -> Result<(), ScreenerError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: signal.alert_text(),
        };

        let res = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScreenerError::Notifier(e.without_url().to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(ScreenerError::Notifier(format!("Telegram returned {}: {}", status, preview)));
        }

        Ok(())
    }
}

/// Writes signals to the log. Used when no chat credentials are configured.
pub struct LogNotifier;

#[async_trait]
impl SignalNotifier for LogNotifier {
    async fn notify(&self, signal: &Signal) -> Result<(), ScreenerError> {
        info!(
            symbol = %signal.symbol,
            side = %signal.side,
            strike = signal.row.strike_price,
            entry = signal.entry(),
            stop_loss = signal.stop_loss,
            target = signal.target,
            "{}",
            signal.alert_text()
        );
        Ok(())
    }
}

/// Telegram when configured, otherwise the log
pub fn notifier_from_config(telegram: Option<&TelegramConfig>) -> Result<Arc<dyn SignalNotifier>, ScreenerError> {
    match telegram {
        Some(telegram) => Ok(Arc::new(TelegramNotifier::new(telegram)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
