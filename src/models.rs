use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Option side as delivered by the exchange (`CE` / `PE` objects)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Call,
    Put,
}

impl Side {
    /// Exchange label used in alert text
    pub fn label(&self) -> &'static str {
        match self {
            Side::Call => "CE",
            Side::Put => "PE",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Contract data for one strike on one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    #[serde(rename = "strikePrice")]
    pub strike_price: f64,

    /// `None` when NSE sent no last traded price; such a row never qualifies
    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,

    #[serde(rename = "previousClose")]
    pub previous_close: f64,

    #[serde(rename = "changeinOpenInterest")]
    pub change_in_oi: f64,

    #[serde(rename = "totalTradedVolume")]
    pub total_traded_volume: f64,

    #[serde(default)]
    pub symbol: String,
}

impl OptionRow {
    /// Change in OI per traded contract. `None` when nothing traded.
    pub fn oi_vol_ratio(&self) -> Option<f64> {
        if self.total_traded_volume > 0.0 {
            Some(self.change_in_oi / self.total_traded_volume)
        } else {
            None
        }
    }
}

/// `CE` / `PE` object inside `records.data[]`, as sent by NSE
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOptionDetail {
    #[serde(rename = "strikePrice", default)]
    pub strike_price: Option<f64>,

    #[serde(rename = "lastPrice", default)]
    pub last_price: Option<f64>,

    #[serde(rename = "previousClose", default)]
    pub previous_close: Option<f64>,

    #[serde(rename = "changeinOpenInterest", default)]
    pub change_in_oi: Option<f64>,

    #[serde(rename = "totalTradedVolume", default)]
    pub total_traded_volume: Option<f64>,
}

impl RawOptionDetail {
    /// Normalize into a row. A missing or zero `previousClose` takes `lastPrice`;
    /// a missing `lastPrice` stays missing.
    pub fn into_row(self, entry_strike: Option<f64>) -> OptionRow {
        let previous_close = match self.previous_close {
            Some(close) if close != 0.0 => close,
            _ => self.last_price.unwrap_or(0.0),
        };

        OptionRow {
            strike_price: self.strike_price.or(entry_strike).unwrap_or(0.0),
            last_price: self.last_price,
            previous_close,
            change_in_oi: self.change_in_oi.unwrap_or(0.0),
            total_traded_volume: self.total_traded_volume.unwrap_or(0.0),
            symbol: String::new(),
        }
    }
}

/// Nearest-expiry option chain for one symbol, split by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub expiry: String,
    pub calls: Vec<OptionRow>,
    pub puts: Vec<OptionRow>,
}

impl OptionChainSnapshot {
    /// Attach the underlying symbol to every row
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        for row in self.calls.iter_mut().chain(self.puts.iter_mut()) {
            row.symbol = symbol.to_string();
        }
        self
    }
}

/// A row that passed a strategy, tagged with its side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub row: OptionRow,
    pub expiry: String,
    pub generated_at: DateTime<Local>,
    pub oi_vol_ratio: f64,
    pub stop_loss: f64,
    pub target: f64,
}

impl Signal {
    pub fn new(symbol: &str, side: Side, row: OptionRow, expiry: &str, generated_at: DateTime<Local>) -> Self {
        let oi_vol_ratio = row.oi_vol_ratio().unwrap_or(0.0);
        let entry = row.last_price.unwrap_or(0.0);
        let stop_loss = round2(entry * 0.8);
        let target = round2(entry * 1.5);

        Self {
            symbol: symbol.to_string(),
            side,
            row,
            expiry: expiry.to_string(),
            generated_at,
            oi_vol_ratio,
            stop_loss,
            target,
        }
    }

    pub fn entry(&self) -> f64 {
        self.row.last_price.unwrap_or(0.0)
    }

    /// Short alert line sent to the chat
    pub fn alert_text(&self) -> String {
        format!("{} {} {} Signal Hit!", self.symbol, self.side, self.row.strike_price)
    }

    /// Multi-line card with entry, risk levels and the numbers behind the signal
    pub fn card(&self) -> String {
        format!(
            "{} {} ({})\n{} | Expiry: {}\nEntry: ₹{} | SL: ₹{} | Target: ₹{}\nOI Change: {} | Vol: {}\nPrev Close: ₹{} | OI/Vol: {:.2}",
            self.side,
            self.row.strike_price,
            self.symbol,
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.expiry,
            self.entry(),
            self.stop_loss,
            self.target,
            self.row.change_in_oi,
            self.row.total_traded_volume,
            self.row.previous_close,
            self.oi_vol_ratio,
        )
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
