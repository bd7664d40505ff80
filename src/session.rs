use crate::config::{self, ExchangeConfig};
use crate::error::ScreenerError;
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client, StatusCode};
use tracing::debug;

// -----------------------------------------------
// WARMED-UP BROWSER SESSION
// -----------------------------------------------

/// HTTP client that has visited the exchange homepage and holds its cookies.
/// Good for one symbol in one cycle.
pub struct Session {
    client: Client,
    exchange: ExchangeConfig,
    user_agent: &'static str,
}

impl Session {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn exchange(&self) -> &ExchangeConfig {
        &self.exchange
    }

    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }
}

/// Build a browser-like client and warm it up against the exchange homepage.
///
/// A non-200 homepage is reported as [`ScreenerError::WarmupFailed`] and is
/// never retried here; the caller decides what to do with the symbol.
pub async fn acquire_session(exchange: &ExchangeConfig) -> Result<Session, ScreenerError> {
    let user_agent = pick_user_agent();
    let client = build_client(exchange, user_agent)?;

    let res = client
        .get(&exchange.base_url)
        .header(header::ACCEPT, config::HEADER_ACCEPT_HTML)
        .timeout(exchange.warmup_timeout)
        .send()
        .await
        .map_err(|e| ScreenerError::Request(format!("warm-up: {}", e)))?;

    let status = res.status();
    debug!(url = %exchange.base_url, status = status.as_u16(), "warm-up response");

    if status != StatusCode::OK {
        return Err(ScreenerError::WarmupFailed(status.as_u16()));
    }

    Ok(Session {
        client,
        exchange: exchange.clone(),
        user_agent,
    })
}

fn pick_user_agent() -> &'static str {
    config::USER_AGENTS
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or(config::USER_AGENTS[0])
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(exchange: &ExchangeConfig, user_agent: &str) -> Result<Client, ScreenerError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static(config::ACCEPT_LANGUAGE),
    );
    headers.insert(
        header::REFERER,
        header::HeaderValue::from_str(&exchange.base_url)
            .map_err(|e| ScreenerError::Config(format!("invalid referer '{}': {}", exchange.base_url, e)))?,
    );

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(user_agent)
        .build()
        .map_err(|e| ScreenerError::Request(format!("failed to build HTTP client: {}", e)))
}
