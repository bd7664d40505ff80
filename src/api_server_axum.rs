use crate::config::{ExchangeConfig, ScreenerConfig};
use crate::error::ScreenerError;
use crate::processor::{self, SymbolSignals};
use crate::rules::ThresholdPolicy;
use crate::{nse_client, session};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignalsQuery {
    pub strategy: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn failed(error: String, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    config: Arc<ScreenerConfig>,
}

impl AppState {
    pub fn new(config: ScreenerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /option-chain/{symbol} - Raw NSE option chain, passed through untouched
async fn get_option_chain(Path(symbol): Path<String>, State(app_state): State<AppState>) -> Response {
    match proxy_option_chain(&app_state.config.exchange, &symbol).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "option chain proxy failed");
            (StatusCode::BAD_GATEWAY, Json(proxy_error_body(&e))).into_response()
        }
    }
}

/// GET /signals/{symbol}?strategy=Breakout&mode=relative - Screen one symbol now
async fn get_signals(
    Path(symbol): Path<String>,
    Query(query): Query<SignalsQuery>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<SymbolSignals>> {
    let start_time = Instant::now();
    let config = &app_state.config;

    let policy = match query.mode.as_deref() {
        Some(mode) => match mode.parse::<ThresholdPolicy>() {
            Ok(policy) => policy,
            Err(e) => return Json(ApiResponse::failed(e.to_string(), start_time)),
        },
        None => config.policy,
    };
    let strategy = query.strategy.as_deref().unwrap_or(&config.strategy);

    match processor::screen_symbol(&config.exchange, &symbol, strategy, policy).await {
        Ok(screened) => Json(ApiResponse::ok(screened, start_time)),
        Err(e) => Json(ApiResponse::failed(e.to_string(), start_time)),
    }
}

async fn health() -> &'static str {
    "ok"
}

// -----------------------------------------------
// HELPER FUNCTIONS
// -----------------------------------------------

async fn proxy_option_chain(exchange: &ExchangeConfig, symbol: &str) -> Result<String, ScreenerError> {
    let session = session::acquire_session(exchange).await?;
    nse_client::fetch_option_chain_body(symbol, &session).await
}

/// `{"error": ..., "status"?: ...}` body returned when the proxy cannot serve a chain
pub fn proxy_error_body(err: &ScreenerError) -> Value {
    match err {
        ScreenerError::WarmupFailed(status) => json!({ "error": "Warmup failed", "status": status }),
        ScreenerError::UpstreamStatus(code) => json!({ "error": format!("NSE returned status {}", code) }),
        other => json!({ "error": other.to_string() }),
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/option-chain/{symbol}", get(get_option_chain))
        .route("/signals/{symbol}", get(get_signals))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(config: ScreenerConfig, port: u16) -> Result<()> {
    let app = router(AppState::new(config));

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "option chain server listening");
    println!("Option chain server running on http://{}", addr);
    println!("Available endpoints:");
    println!("   GET  /option-chain/{{symbol}}");
    println!("   GET  /signals/{{symbol}}?strategy=Breakout&mode=relative");
    println!("   GET  /health");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
