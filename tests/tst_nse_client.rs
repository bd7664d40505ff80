mod common;

use axum::http::StatusCode;
use common::{spawn_exchange, spawn_silent_listener, ExchangeBehaviour, NIFTY_CHAIN, STALLED_SYMBOL};
use nse_signal_screener::{
    acquire_session, config, fetch_option_chain, fetch_option_chain_body, ExchangeConfig, ScreenerError,
};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_carries_warmup_cookies() {
        let base = spawn_exchange(ExchangeBehaviour::healthy()).await;
        let session = acquire_session(&ExchangeConfig::with_base_url(base)).await.unwrap();

        assert!(config::USER_AGENTS.contains(&session.user_agent()));

        // The fake exchange answers 401 to any data call without the homepage cookie
        let body = fetch_option_chain_body("NIFTY", &session).await.unwrap();
        assert_eq!(body, NIFTY_CHAIN);
    }

    #[tokio::test]
    async fn test_blocked_homepage_fails_warmup() {
        let behaviour = ExchangeBehaviour::blocking_homepage(StatusCode::FORBIDDEN);
        let base = spawn_exchange(behaviour).await;

        match acquire_session(&ExchangeConfig::with_base_url(base)).await {
            Err(e) => assert_eq!(e, ScreenerError::WarmupFailed(403)),
            Ok(_) => panic!("warm-up should fail on a 403 homepage"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_keeps_two_sided_strikes() {
        let base = spawn_exchange(ExchangeBehaviour::healthy()).await;
        let session = acquire_session(&ExchangeConfig::with_base_url(base)).await.unwrap();

        let snapshot = fetch_option_chain("NIFTY", &session).await.unwrap();
        assert_eq!(snapshot.expiry, "30-Oct-2025");

        let call_strikes: Vec<f64> = snapshot.calls.iter().map(|r| r.strike_price).collect();
        let put_strikes: Vec<f64> = snapshot.puts.iter().map(|r| r.strike_price).collect();
        assert_eq!(call_strikes, vec![22000.0, 22100.0, 22200.0]);
        assert_eq!(put_strikes, vec![22000.0, 22100.0, 22200.0]);

        // 22200 CE has no previousClose in the payload
        assert_eq!(Some(snapshot.calls[2].previous_close), snapshot.calls[2].last_price);
        assert!(snapshot.calls.iter().all(|r| r.symbol.is_empty()));

        let tagged = snapshot.with_symbol("NIFTY");
        assert!(tagged.calls.iter().chain(tagged.puts.iter()).all(|r| r.symbol == "NIFTY"));
    }

    #[tokio::test]
    async fn test_identical_payload_gives_identical_snapshot() {
        let base = spawn_exchange(ExchangeBehaviour::healthy()).await;
        let exchange = ExchangeConfig::with_base_url(base);

        let first = fetch_option_chain("NIFTY", &acquire_session(&exchange).await.unwrap())
            .await
            .unwrap();
        let second = fetch_option_chain("NIFTY", &acquire_session(&exchange).await.unwrap())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_shape_and_status_errors() {
        let base = spawn_exchange(ExchangeBehaviour::healthy()).await;
        let session = acquire_session(&ExchangeConfig::with_base_url(base)).await.unwrap();

        match fetch_option_chain("BROKEN", &session).await {
            Err(ScreenerError::MalformedResponse(preview)) => assert!(preview.contains("no records here")),
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(
            fetch_option_chain("NOEXPIRY", &session).await,
            Err(ScreenerError::NoExpiryData)
        );
        assert_eq!(
            fetch_option_chain("UNLISTED", &session).await,
            Err(ScreenerError::UpstreamStatus(404))
        );
        assert_eq!(
            fetch_option_chain("DOWN", &session).await,
            Err(ScreenerError::UpstreamStatus(503))
        );
    }

    #[tokio::test]
    async fn test_fetch_is_not_retried_by_default() {
        let behaviour = ExchangeBehaviour::healthy();
        let base = spawn_exchange(behaviour.clone()).await;
        let session = acquire_session(&ExchangeConfig::with_base_url(base)).await.unwrap();

        let _ = fetch_option_chain("DOWN", &session).await;
        assert_eq!(behaviour.hits(), 1);
    }

    #[tokio::test]
    async fn test_bounded_retry_on_server_errors_only() {
        let behaviour = ExchangeBehaviour::healthy();
        let base = spawn_exchange(behaviour.clone()).await;
        let exchange = ExchangeConfig {
            fetch_retries: 2,
            ..ExchangeConfig::with_base_url(base)
        };
        let session = acquire_session(&exchange).await.unwrap();

        assert_eq!(
            fetch_option_chain("DOWN", &session).await,
            Err(ScreenerError::UpstreamStatus(503))
        );
        assert_eq!(behaviour.hits(), 3);

        // 404 is not worth a second try
        let _ = fetch_option_chain("UNLISTED", &session).await;
        assert_eq!(behaviour.hits(), 4);
    }

    #[tokio::test]
    async fn test_silent_homepage_hits_warmup_timeout() {
        let base = spawn_silent_listener().await;
        let exchange = ExchangeConfig {
            warmup_timeout: Duration::from_millis(300),
            ..ExchangeConfig::with_base_url(base)
        };

        let started = Instant::now();
        let result = acquire_session(&exchange).await;
        assert!(started.elapsed() < Duration::from_secs(3));
        match result {
            Err(ScreenerError::Request(msg)) => assert!(msg.starts_with("warm-up")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("warm-up against a silent homepage succeeded"),
        }
    }

    #[tokio::test]
    async fn test_stalled_data_call_hits_fetch_timeout() {
        let base = spawn_exchange(ExchangeBehaviour::healthy()).await;
        let exchange = ExchangeConfig {
            fetch_timeout: Duration::from_millis(300),
            ..ExchangeConfig::with_base_url(base)
        };
        let session = acquire_session(&exchange).await.unwrap();

        let started = Instant::now();
        let result = fetch_option_chain_body(STALLED_SYMBOL, &session).await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(result, Err(ScreenerError::Request(_))));

        // The same session still serves other symbols
        assert_eq!(fetch_option_chain_body("NIFTY", &session).await.unwrap(), NIFTY_CHAIN);
    }
}
