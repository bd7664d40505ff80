use crate::config;
use crate::error::ScreenerError;
use crate::models::{OptionChainSnapshot, RawOptionDetail};
use crate::session::Session;
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 200;

// -----------------------------------------------
// RAW OPTION CHAIN BODY
// -----------------------------------------------

/// Fetch the option-chain body for `symbol` exactly as NSE sent it.
///
/// Retries only when the session's exchange config allows it, and only for
/// transport errors and 429/5xx statuses.
pub async fn fetch_option_chain_body(symbol: &str, session: &Session) -> Result<String, ScreenerError> {
    let url = config::nse_option_chain_url(&session.exchange().base_url, symbol);
    let retries = session.exchange().fetch_retries;

    let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
        .factor(config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
        .map(jitter)
        .take(retries);

    RetryIf::start(
        backoff,
        || fetch_once(&url, session),
        |e: &ScreenerError| {
            let retry = e.is_retryable();
            if retry && retries > 0 {
                warn!(url = %url, error = %e, "retrying option chain fetch");
            }
            retry
        },
    )
    .await
}

async fn fetch_once(url: &str, session: &Session) -> Result<String, ScreenerError> {
    let res = session
        .client()
        .get(url)
        .header(header::ACCEPT, "application/json")
        .timeout(session.exchange().fetch_timeout)
        .send()
        .await?;

    let status = res.status();
    debug!(url = %url, status = status.as_u16(), "option chain response");

    if status != StatusCode::OK {
        return Err(ScreenerError::UpstreamStatus(status.as_u16()));
    }

    Ok(res.text().await?)
}

// -----------------------------------------------
// OPTION CHAIN SNAPSHOT
// -----------------------------------------------

/// Fetch and normalize the nearest-expiry option chain for `symbol`.
/// Rows come back without a symbol; see [`OptionChainSnapshot::with_symbol`].
pub async fn fetch_option_chain(symbol: &str, session: &Session) -> Result<OptionChainSnapshot, ScreenerError> {
    let text = fetch_option_chain_body(symbol, session).await?;
    let body: Value = serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        ScreenerError::Parse(format!("{} (body: {})", e, preview))
    })?;
    parse_option_chain(&body)
}

/// Normalize a decoded option-chain body.
///
/// Only strikes carrying both a `CE` and a `PE` object are kept; one-sided
/// strikes are dropped.
pub fn parse_option_chain(body: &Value) -> Result<OptionChainSnapshot, ScreenerError> {
    let records = body.get("records").ok_or_else(|| {
        let preview: String = body.to_string().chars().take(PREVIEW_CHARS).collect();
        ScreenerError::MalformedResponse(preview)
    })?;

    let expiry = records
        .get("expiryDates")
        .and_then(Value::as_array)
        .and_then(|dates| dates.first())
        .and_then(Value::as_str)
        .ok_or(ScreenerError::NoExpiryData)?
        .to_string();

    let mut calls = Vec::new();
    let mut puts = Vec::new();

    let entries = records.get("data").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    for entry in entries {
        let (Some(ce), Some(pe)) = (
            entry.get("CE").filter(|v| v.is_object()),
            entry.get("PE").filter(|v| v.is_object()),
        ) else {
            continue;
        };

        let strike = entry.get("strikePrice").and_then(Value::as_f64);
        let ce: RawOptionDetail = serde_json::from_value(ce.clone())?;
        let pe: RawOptionDetail = serde_json::from_value(pe.clone())?;

        calls.push(ce.into_row(strike));
        puts.push(pe.into_row(strike));
    }

    Ok(OptionChainSnapshot { expiry, calls, puts })
}
