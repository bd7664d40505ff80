use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenerError {
    /// Homepage warm-up answered with something other than 200.
    WarmupFailed(u16),
    /// Option-chain endpoint answered with something other than 200.
    UpstreamStatus(u16),
    /// Body decoded but has no `records` key. Holds a preview of the body.
    MalformedResponse(String),
    NoExpiryData,
    Request(String),
    Parse(String),
    Notifier(String),
    Config(String),
    Task(String),
}

impl ScreenerError {
    /// Transport failures and throttling/server statuses may succeed on a second try.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScreenerError::Request(_) => true,
            ScreenerError::UpstreamStatus(code) => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

impl fmt::Display for ScreenerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScreenerError::WarmupFailed(status) => write!(f, "Warmup failed with status {}", status),
            ScreenerError::UpstreamStatus(code) => write!(f, "NSE returned status {}", code),
            ScreenerError::MalformedResponse(preview) => write!(f, "Malformed response: {}", preview),
            ScreenerError::NoExpiryData => write!(f, "No expiry dates in response"),
            ScreenerError::Request(msg) => write!(f, "Request error: {}", msg),
            ScreenerError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ScreenerError::Notifier(msg) => write!(f, "Notifier error: {}", msg),
            ScreenerError::Config(msg) => write!(f, "Config error: {}", msg),
            ScreenerError::Task(msg) => write!(f, "Task error: {}", msg),
        }
    }
}

impl std::error::Error for ScreenerError {}

impl From<reqwest::Error> for ScreenerError {
    fn from(err: reqwest::Error) -> Self {
        ScreenerError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for ScreenerError {
    fn from(err: serde_json::Error) -> Self {
        ScreenerError::Parse(err.to_string())
    }
}
