use crate::error::ScreenerError;
use crate::models::OptionRow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five screening strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Breakout,
    Reversal,
    #[serde(rename = "Volume Spike")]
    VolumeSpike,
    #[serde(rename = "OI Surge")]
    OiSurge,
    Momentum,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Breakout,
        StrategyKind::Reversal,
        StrategyKind::VolumeSpike,
        StrategyKind::OiSurge,
        StrategyKind::Momentum,
    ];

    /// Exact display-name lookup. Anything else is `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Breakout => "Breakout",
            StrategyKind::Reversal => "Reversal",
            StrategyKind::VolumeSpike => "Volume Spike",
            StrategyKind::OiSurge => "OI Surge",
            StrategyKind::Momentum => "Momentum",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How strategy thresholds are derived.
///
/// `Relative` compares each row against averages of the rows being screened,
/// `Fixed` compares against constant cut-offs. Both produce different signal
/// sets for the same chain, so the choice is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPolicy {
    Relative,
    Fixed,
}

impl ThresholdPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdPolicy::Relative => "relative",
            ThresholdPolicy::Fixed => "fixed",
        }
    }
}

impl fmt::Display for ThresholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdPolicy {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relative" => Ok(ThresholdPolicy::Relative),
            "fixed" => Ok(ThresholdPolicy::Fixed),
            other => Err(ScreenerError::Config(format!(
                "unknown threshold mode '{}', expected 'relative' or 'fixed'",
                other
            ))),
        }
    }
}

// -----------------------------------------------
// FIXED POLICY CUT-OFFS
// -----------------------------------------------
const FIXED_OI_VOL_RATIO: f64 = 0.5;
const FIXED_MOMENTUM_OI_VOL_RATIO: f64 = 0.8;
const FIXED_MOMENTUM_PRICE_FACTOR: f64 = 1.05;
const FIXED_VOLUME: f64 = 30000.0;
const FIXED_CHANGE_IN_OI: f64 = 10000.0;

// -----------------------------------------------
// RELATIVE POLICY MULTIPLIERS
// -----------------------------------------------
const SPIKE_MULTIPLIER: f64 = 1.5;
const RELATIVE_MOMENTUM_PRICE_FACTOR: f64 = 1.03;

/// A traded row with its OI/volume ratio
#[derive(Debug, Clone, Copy)]
struct RatedRow<'a> {
    row: &'a OptionRow,
    oi_vol_ratio: f64,
}

/// Means over the rows that survived the volume filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationAverages {
    pub avg_change_in_oi: f64,
    pub avg_volume: f64,
    pub avg_oi_vol_ratio: f64,
}

impl PopulationAverages {
    fn from_rated(rated: &[RatedRow]) -> Self {
        let n = rated.len() as f64;
        let (oi, vol, ratio) = rated.iter().fold((0.0, 0.0, 0.0), |(oi, vol, ratio), r| {
            (oi + r.row.change_in_oi, vol + r.row.total_traded_volume, ratio + r.oi_vol_ratio)
        });

        Self {
            avg_change_in_oi: oi / n,
            avg_volume: vol / n,
            avg_oi_vol_ratio: ratio / n,
        }
    }
}

/// Concrete cut-offs a row is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub oi_vol_ratio: f64,
    pub momentum_oi_vol_ratio: f64,
    pub momentum_price_factor: f64,
    pub volume: f64,
    pub change_in_oi: f64,
}

impl Thresholds {
    pub fn fixed() -> Self {
        Self {
            oi_vol_ratio: FIXED_OI_VOL_RATIO,
            momentum_oi_vol_ratio: FIXED_MOMENTUM_OI_VOL_RATIO,
            momentum_price_factor: FIXED_MOMENTUM_PRICE_FACTOR,
            volume: FIXED_VOLUME,
            change_in_oi: FIXED_CHANGE_IN_OI,
        }
    }

    pub fn relative(avg: &PopulationAverages) -> Self {
        Self {
            oi_vol_ratio: avg.avg_oi_vol_ratio,
            momentum_oi_vol_ratio: avg.avg_oi_vol_ratio * SPIKE_MULTIPLIER,
            momentum_price_factor: RELATIVE_MOMENTUM_PRICE_FACTOR,
            volume: avg.avg_volume * SPIKE_MULTIPLIER,
            change_in_oi: avg.avg_change_in_oi * SPIKE_MULTIPLIER,
        }
    }
}

/// Drop untraded rows and attach the OI/volume ratio to the rest
fn rate_rows(rows: &[OptionRow]) -> Vec<RatedRow<'_>> {
    rows.iter()
        .filter_map(|row| {
            row.oi_vol_ratio().map(|oi_vol_ratio| RatedRow { row, oi_vol_ratio })
        })
        .collect()
}

fn qualifies(rated: &RatedRow, strategy: StrategyKind, t: &Thresholds) -> bool {
    let row = rated.row;
    // Unpriced rows still count toward the averages but never fire
    let Some(price) = row.last_price else {
        return false;
    };
    match strategy {
        StrategyKind::Breakout => price > row.previous_close && rated.oi_vol_ratio > t.oi_vol_ratio,
        StrategyKind::Reversal => price < row.previous_close && rated.oi_vol_ratio > t.oi_vol_ratio,
        StrategyKind::VolumeSpike => row.total_traded_volume > t.volume,
        StrategyKind::OiSurge => row.change_in_oi > t.change_in_oi,
        StrategyKind::Momentum => {
            price > row.previous_close * t.momentum_price_factor
                && rated.oi_vol_ratio > t.momentum_oi_vol_ratio
        }
    }
}

/// Rows from `rows` that satisfy `strategy` under `policy`, in input order
pub fn apply_strategy(rows: &[OptionRow], strategy: StrategyKind, policy: ThresholdPolicy) -> Vec<OptionRow> {
    let rated = rate_rows(rows);
    if rated.is_empty() {
        return Vec::new();
    }

    let thresholds = match policy {
        ThresholdPolicy::Relative => Thresholds::relative(&PopulationAverages::from_rated(&rated)),
        ThresholdPolicy::Fixed => Thresholds::fixed(),
    };

    rated
        .iter()
        .filter(|r| qualifies(r, strategy, &thresholds))
        .map(|r| r.row.clone())
        .collect()
}

/// Same as [`apply_strategy`] but by display name; an unknown name screens to nothing
pub fn apply_named_strategy(rows: &[OptionRow], name: &str, policy: ThresholdPolicy) -> Vec<OptionRow> {
    match StrategyKind::from_name(name) {
        Some(strategy) => apply_strategy(rows, strategy, policy),
        None => Vec::new(),
    }
}

/// Averages over traded rows, or `None` when nothing traded
pub fn population_averages(rows: &[OptionRow]) -> Option<PopulationAverages> {
    let rated = rate_rows(rows);
    if rated.is_empty() {
        None
    } else {
        Some(PopulationAverages::from_rated(&rated))
    }
}

/// Side-level summary over every row, traded or not
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    pub rows: usize,
    pub avg_change_in_oi: f64,
    pub avg_volume: f64,
}

impl ChainStats {
    pub fn from_rows(rows: &[OptionRow]) -> Self {
        if rows.is_empty() {
            return Self { rows: 0, avg_change_in_oi: 0.0, avg_volume: 0.0 };
        }
        let n = rows.len() as f64;
        Self {
            rows: rows.len(),
            avg_change_in_oi: rows.iter().map(|r| r.change_in_oi).sum::<f64>() / n,
            avg_volume: rows.iter().map(|r| r.total_traded_volume).sum::<f64>() / n,
        }
    }
}
