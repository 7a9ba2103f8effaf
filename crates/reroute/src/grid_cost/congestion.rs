use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Congestion level
// =============================================================================

/// Coarse traffic state of a cell, bucketed from the current/free-flow
/// speed ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    FreeFlow,
    Light,
    Moderate,
    Heavy,
    Standstill,
}

impl CongestionLevel {
    pub fn from_speed_ratio(speed_ratio: f64) -> Self {
        if speed_ratio.is_nan() || speed_ratio <= 0.15 {
            CongestionLevel::Standstill
        } else if speed_ratio < 0.4 {
            CongestionLevel::Heavy
        } else if speed_ratio < 0.65 {
            CongestionLevel::Moderate
        } else if speed_ratio < 0.85 {
            CongestionLevel::Light
        } else {
            CongestionLevel::FreeFlow
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CongestionLevel::FreeFlow => "free flow",
            CongestionLevel::Light => "light",
            CongestionLevel::Moderate => "moderate",
            CongestionLevel::Heavy => "heavy",
            CongestionLevel::Standstill => "standstill",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Samples
// =============================================================================

/// Latest congestion reading for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CongestionSample {
    pub level: CongestionLevel,
    /// Current speed divided by free-flow speed.
    pub speed_ratio: f64,
    pub updated_at: Duration,
}

impl CongestionSample {
    pub fn is_stale(&self, now: Duration, ttl: Duration) -> bool {
        now.saturating_sub(self.updated_at) > ttl
    }
}

/// `1 / speed_ratio`, never below 1. A zero, negative or NaN ratio means
/// the cell is at a standstill and costs `standstill_multiplier`.
pub fn congestion_cost_multiplier(speed_ratio: f64, standstill_multiplier: f64) -> f64 {
    if speed_ratio.is_nan() || speed_ratio <= 0.0 {
        return standstill_multiplier;
    }
    (1.0 / speed_ratio).max(1.0)
}
