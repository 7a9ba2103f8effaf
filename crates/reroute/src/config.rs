//! Session configuration.
//!
//! Every tunable of the monitor is a named constant with a matching field on
//! [`MonitorConfig`], so hosts can override the decision thresholds without
//! touching code. The 30% cost threshold and the 0.7 severity threshold have
//! no documented derivation and should be validated against real traffic.

use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SpatialError};
use crate::geo::BoundingBox;
use crate::spatial_index::Resolution;

/// Grid resolution used for routes and events (~174 m edges).
pub const DEFAULT_RESOLUTION: u8 = 9;

/// Cumulative `sum(multiplier - 1)` over on-route events above which a
/// reroute is required.
pub const DEFAULT_REROUTE_COST_THRESHOLD: f64 = 0.30;

/// Severity at or above which any event kind requires a reroute.
pub const DEFAULT_SEVERITY_REROUTE_THRESHOLD: f64 = 0.7;

pub const DEFAULT_EVENT_RADIUS_KM: f64 = 0.5;

/// Largest effect radius an event may carry. Reported radii above it are
/// clamped.
pub const MAX_EVENT_RADIUS_KM: f64 = 25.0;

pub const DEFAULT_MONITOR_INTERVAL_SECS: f64 = 30.0;

pub const DEFAULT_SIMULATION_INTERVAL_SECS: f64 = 20.0;

/// Probability that a synthetic event is placed near the active route.
pub const DEFAULT_NEAR_ROUTE_PROBABILITY: f64 = 0.7;

/// Max distance of a near-route synthetic event from its route vertex.
pub const DEFAULT_NEAR_ROUTE_SPREAD_M: f64 = 400.0;

/// Random jitter applied to every synthetic position.
pub const DEFAULT_POSITION_JITTER_M: f64 = 25.0;

pub const DEFAULT_MAX_SIMULATED_EVENTS: usize = 25;

pub const DEFAULT_RNG_SEED: u64 = 42;

/// Congestion cost multiplier of a cell whose speed ratio is zero or
/// negative. Positive ratios cost `1 / ratio` and may exceed it.
pub const DEFAULT_MAX_CONGESTION_MULTIPLIER: f64 = 10.0;

pub const DEFAULT_CONGESTION_TTL_SECS: f64 = 600.0;

/// Padding around the route's bounding box when no simulation region is set.
pub const DEFAULT_REGION_PADDING_M: f64 = 2_000.0;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub resolution: u8,
    pub reroute_cost_threshold: f64,
    pub severity_reroute_threshold: f64,
    pub default_radius_km: f64,
    pub monitor_interval_secs: f64,
    pub simulation_interval_secs: f64,
    pub near_route_probability: f64,
    pub near_route_spread_m: f64,
    pub position_jitter_m: f64,
    /// Region for uniformly placed synthetic events. Falls back to the
    /// padded route bounding box.
    pub simulation_region: Option<BoundingBox>,
    pub max_simulated_events: usize,
    pub rng_seed: u64,
    pub max_congestion_multiplier: f64,
    pub congestion_ttl_secs: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            reroute_cost_threshold: DEFAULT_REROUTE_COST_THRESHOLD,
            severity_reroute_threshold: DEFAULT_SEVERITY_REROUTE_THRESHOLD,
            default_radius_km: DEFAULT_EVENT_RADIUS_KM,
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL_SECS,
            simulation_interval_secs: DEFAULT_SIMULATION_INTERVAL_SECS,
            near_route_probability: DEFAULT_NEAR_ROUTE_PROBABILITY,
            near_route_spread_m: DEFAULT_NEAR_ROUTE_SPREAD_M,
            position_jitter_m: DEFAULT_POSITION_JITTER_M,
            simulation_region: None,
            max_simulated_events: DEFAULT_MAX_SIMULATED_EVENTS,
            rng_seed: DEFAULT_RNG_SEED,
            max_congestion_multiplier: DEFAULT_MAX_CONGESTION_MULTIPLIER,
            congestion_ttl_secs: DEFAULT_CONGESTION_TTL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Resolution::new(self.resolution)
            .map_err(|e: SpatialError| ConfigError::Invalid(e.to_string()))?;
        positive("reroute_cost_threshold", self.reroute_cost_threshold)?;
        unit_interval("severity_reroute_threshold", self.severity_reroute_threshold)?;
        non_negative("default_radius_km", self.default_radius_km)?;
        if self.default_radius_km > MAX_EVENT_RADIUS_KM {
            return Err(ConfigError::Invalid(format!(
                "default_radius_km must be at most {MAX_EVENT_RADIUS_KM}, got {}",
                self.default_radius_km
            )));
        }
        positive("monitor_interval_secs", self.monitor_interval_secs)?;
        positive("simulation_interval_secs", self.simulation_interval_secs)?;
        unit_interval("near_route_probability", self.near_route_probability)?;
        non_negative("near_route_spread_m", self.near_route_spread_m)?;
        non_negative("position_jitter_m", self.position_jitter_m)?;
        if self.max_congestion_multiplier < 1.0 || !self.max_congestion_multiplier.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "max_congestion_multiplier must be a finite value >= 1.0, got {}",
                self.max_congestion_multiplier
            )));
        }
        positive("congestion_ttl_secs", self.congestion_ttl_secs)?;
        if let Some(region) = &self.simulation_region {
            if !region.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "simulation_region is not a valid box: {region:?}"
                )));
            }
        }
        Ok(())
    }

    /// The configured grid resolution. Falls back to the default when the
    /// config was built in code without [`validate`](Self::validate).
    pub fn grid_resolution(&self) -> Resolution {
        Resolution::new(self.resolution)
            .unwrap_or_else(|_| Resolution::saturating(DEFAULT_RESOLUTION))
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs_f64(self.monitor_interval_secs.max(0.001))
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs_f64(self.simulation_interval_secs.max(0.001))
    }

    pub fn congestion_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.congestion_ttl_secs.max(0.0))
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be >= 0, got {value}")))
    }
}

fn unit_interval(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
