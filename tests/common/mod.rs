#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// CE rows: 22000 up / ratio 0.6, 22100 down / ratio 0.1, 22200 untraded.
/// PE rows: 22000 down / ratio 0.9, 22100 up / 0.1, 22200 up / 0.1.
/// 22300 only has a CE leg and must be dropped.
pub const NIFTY_CHAIN: &str = r#"{
  "records": {
    "expiryDates": ["30-Oct-2025", "06-Nov-2025", "13-Nov-2025"],
    "underlyingValue": 22043.5,
    "data": [
      {
        "strikePrice": 22000, "expiryDate": "30-Oct-2025",
        "CE": { "strikePrice": 22000, "underlying": "NIFTY", "lastPrice": 120, "previousClose": 100, "changeinOpenInterest": 6000, "totalTradedVolume": 10000 },
        "PE": { "strikePrice": 22000, "underlying": "NIFTY", "lastPrice": 40, "previousClose": 50, "changeinOpenInterest": 9000, "totalTradedVolume": 10000 }
      },
      {
        "strikePrice": 22100, "expiryDate": "30-Oct-2025",
        "CE": { "strikePrice": 22100, "underlying": "NIFTY", "lastPrice": 80, "previousClose": 90, "changeinOpenInterest": 1000, "totalTradedVolume": 10000 },
        "PE": { "strikePrice": 22100, "underlying": "NIFTY", "lastPrice": 60, "previousClose": 55, "changeinOpenInterest": 2000, "totalTradedVolume": 20000 }
      },
      {
        "strikePrice": 22200, "expiryDate": "30-Oct-2025",
        "CE": { "strikePrice": 22200, "underlying": "NIFTY", "lastPrice": 50, "changeinOpenInterest": 40000, "totalTradedVolume": 0 },
        "PE": { "strikePrice": 22200, "underlying": "NIFTY", "lastPrice": 70, "previousClose": 60, "changeinOpenInterest": 500, "totalTradedVolume": 5000 }
      },
      {
        "strikePrice": 22300, "expiryDate": "30-Oct-2025",
        "CE": { "strikePrice": 22300, "underlying": "NIFTY", "lastPrice": 200, "previousClose": 100, "changeinOpenInterest": 90000, "totalTradedVolume": 100000 }
      }
    ]
  },
  "filtered": { "CE": { "totOI": 1 }, "PE": { "totOI": 2 } }
}"#;

pub const SESSION_COOKIE: &str = "nsit=warm";

/// Symbol whose data call is accepted but not answered for a long time
pub const STALLED_SYMBOL: &str = "STALLED";

/// What the fake exchange does on each request
#[derive(Clone)]
pub struct ExchangeBehaviour {
    pub homepage_status: StatusCode,
    pub chains: HashMap<String, (StatusCode, String)>,
    pub data_hits: Arc<Mutex<usize>>,
}

impl ExchangeBehaviour {
    pub fn healthy() -> Self {
        let mut chains = HashMap::new();
        chains.insert("NIFTY".to_string(), (StatusCode::OK, NIFTY_CHAIN.to_string()));
        chains.insert("BANKNIFTY".to_string(), (StatusCode::OK, NIFTY_CHAIN.replace("NIFTY", "BANKNIFTY")));
        chains.insert("BROKEN".to_string(), (StatusCode::OK, r#"{"message":"no records here"}"#.to_string()));
        chains.insert("NOEXPIRY".to_string(), (StatusCode::OK, r#"{"records":{"expiryDates":[],"data":[]}}"#.to_string()));
        chains.insert("DOWN".to_string(), (StatusCode::SERVICE_UNAVAILABLE, "maintenance".to_string()));
        Self {
            homepage_status: StatusCode::OK,
            chains,
            data_hits: Arc::new(Mutex::new(0)),
        }
    }

    pub fn blocking_homepage(status: StatusCode) -> Self {
        Self {
            homepage_status: status,
            ..Self::healthy()
        }
    }

    pub fn hits(&self) -> usize {
        *self.data_hits.lock().unwrap()
    }
}

async fn homepage(State(behaviour): State<ExchangeBehaviour>) -> Response {
    (
        behaviour.homepage_status,
        [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
        "<html>NSE</html>",
    )
        .into_response()
}

async fn option_chain(
    State(behaviour): State<ExchangeBehaviour>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    *behaviour.data_hits.lock().unwrap() += 1;

    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SESSION_COOKIE));
    if !has_cookie {
        return (StatusCode::UNAUTHORIZED, "{}").into_response();
    }

    let symbol = params.get("symbol").cloned().unwrap_or_default();
    if symbol == STALLED_SYMBOL {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    match behaviour.chains.get(&symbol) {
        Some((status, body)) => (*status, [(header::CONTENT_TYPE, "application/json")], body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "{}").into_response(),
    }
}

/// Serve a fake NSE on an ephemeral loopback port and return its base URL
pub async fn spawn_exchange(behaviour: ExchangeBehaviour) -> String {
    let app = Router::new()
        .route("/", get(homepage))
        .route("/api/option-chain-indices", get(option_chain))
        .with_state(behaviour);
    format!("http://{}", serve(app).await)
}

/// Accepts TCP connections and never writes a byte back
pub async fn spawn_silent_listener() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{}", addr)
}

/// Fake Telegram bot API that records every `sendMessage` body
#[derive(Clone)]
pub struct TelegramRecorder {
    pub status: StatusCode,
    pub messages: Arc<Mutex<Vec<Value>>>,
}

impl TelegramRecorder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().unwrap().clone()
    }
}

async fn send_message(State(recorder): State<TelegramRecorder>, Json(body): Json<Value>) -> Response {
    recorder.messages.lock().unwrap().push(body);
    (recorder.status, Json(serde_json::json!({ "ok": recorder.status.is_success() }))).into_response()
}

pub async fn spawn_telegram(recorder: TelegramRecorder, bot_token: &str) -> String {
    let app = Router::new()
        .route(&format!("/bot{}/sendMessage", bot_token), post(send_message))
        .with_state(recorder);
    format!("http://{}", serve(app).await)
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
