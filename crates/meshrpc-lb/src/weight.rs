//! Nominal and warmup-adjusted instance weights.
//!
//! A freshly started instance does not take its full share of traffic at
//! once. While `0 < uptime < warmup` its weight ramps linearly:
//!
//! ```text
//! effective = floor(uptime / (warmup / weight)), clamped to [1, weight]
//! ```
//!
//! Outside that window, or when the start time is unknown, the nominal weight
//! applies unchanged.

use std::time::{SystemTime, UNIX_EPOCH};

use meshrpc_core::ServiceInstance;
use serde::{Deserialize, Serialize};

/// Property holding the nominal weight.
pub const PROP_WEIGHT: &str = "weight";
/// Property holding the warmup duration in milliseconds.
pub const PROP_WARMUP: &str = "warmup";
/// Property holding the start timestamp (epoch millis) when the instance has
/// no explicit start time.
pub const PROP_TIMESTAMP: &str = "timestamp";

/// Defaults applied when an instance does not carry weight properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Weight of an instance without a `weight` property.
    pub default_weight: u32,
    /// Warmup of an instance without a `warmup` property, in milliseconds.
    pub default_warmup_ms: u64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            default_weight: 100,
            default_warmup_ms: 10 * 60 * 1000,
        }
    }
}

/// Ramp `weight` down for an instance `uptime_ms` into a `warmup_ms` window.
pub fn warmup_weight(uptime_ms: u64, warmup_ms: u64, weight: u32) -> u32 {
    let ww = (uptime_ms as f64 / (warmup_ms as f64 / weight as f64)) as u64;
    ww.clamp(1, weight.max(1) as u64) as u32
}

/// Start time of `instance` in epoch millis, or 0 when unknown.
pub fn start_time_ms(instance: &ServiceInstance) -> u64 {
    match instance.start_time() {
        Some(at) => epoch_millis(at),
        None => instance.prop(PROP_TIMESTAMP, 0u64),
    }
}

/// Effective selection weight of `instance` at `now`.
///
/// Non-positive nominal weights are clamped to 0 instead of passing through,
/// so a misconfigured instance drops out of weighted selection rather than
/// skewing the total.
pub fn effective_weight(instance: &ServiceInstance, now: SystemTime, config: &WeightConfig) -> u32 {
    let weight: i64 = instance.prop(PROP_WEIGHT, i64::from(config.default_weight));
    if weight <= 0 {
        return 0;
    }
    let weight = weight.min(i64::from(u32::MAX)) as u32;

    let started = start_time_ms(instance);
    if started == 0 {
        return weight;
    }
    let uptime = epoch_millis(now) as i64 - started as i64;
    let warmup: u64 = instance.prop(PROP_WARMUP, config.default_warmup_ms);
    if uptime > 0 && (uptime as u64) < warmup {
        warmup_weight(uptime as u64, warmup, weight)
    } else {
        weight
    }
}

fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
