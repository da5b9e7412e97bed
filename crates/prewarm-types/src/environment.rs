//! One-shot environment probe.
//!
//! Classifies network quality and device capability at startup. The reading
//! is computed once, injected into the loader runtime, and treated as
//! immutable for the process lifetime. Probing must never fail: absent or
//! unparseable inputs degrade to `Medium` / not-low-end.
//!
//! Probe inputs (all optional):
//! - `PREWARM_NETWORK`: explicit override, one of `slow` / `medium` / `fast`
//! - `PREWARM_DOWNLINK_MBPS`: measured downlink, classified by [`NetworkSpeed::from_downlink_mbps`]
//! - `PREWARM_LOW_END_DEVICE`: truthy value forces the low-end classification
//! - `PREWARM_DEVICE_MEMORY_GB`: reported memory; 2 GB or less is low-end
//! - `PREWARM_CPU_CORES`: core-count override; otherwise
//!   `std::thread::available_parallelism()` is consulted

use serde::{Deserialize, Serialize};

use crate::env_utils::{env_bool, env_var};

/// Memory at or below this many gigabytes classifies a device as low-end.
const LOW_END_MEMORY_GB: f64 = 2.0;

/// Core counts at or below this classify a device as low-end.
const LOW_END_CORES: usize = 2;

/// Coarse network quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkSpeed {
    Slow,
    Medium,
    Fast,
}

impl NetworkSpeed {
    /// Classify a measured downlink in Mbps.
    pub fn from_downlink_mbps(mbps: f64) -> Self {
        if mbps < 1.0 {
            NetworkSpeed::Slow
        } else if mbps < 10.0 {
            NetworkSpeed::Medium
        } else {
            NetworkSpeed::Fast
        }
    }

    /// Parse a tier name, case-insensitive. Unknown names return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "slow" => Some(NetworkSpeed::Slow),
            "medium" => Some(NetworkSpeed::Medium),
            "fast" => Some(NetworkSpeed::Fast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkSpeed::Slow => "slow",
            NetworkSpeed::Medium => "medium",
            NetworkSpeed::Fast => "fast",
        }
    }
}

/// Cached classification of network quality and device capability.
///
/// Read-only after construction; a missing probe capability defaults to
/// `Medium` / not-low-end rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub network_speed: NetworkSpeed,
    pub is_low_end_device: bool,
}

impl Default for EnvironmentReading {
    fn default() -> Self {
        Self {
            network_speed: NetworkSpeed::Medium,
            is_low_end_device: false,
        }
    }
}

impl EnvironmentReading {
    pub fn new(network_speed: NetworkSpeed, is_low_end_device: bool) -> Self {
        Self {
            network_speed,
            is_low_end_device,
        }
    }

    /// Probe the process environment once. Never panics; every failure path
    /// degrades to the default reading.
    pub fn detect() -> Self {
        let network_speed = classify_network(
            env_var::<String>("PREWARM_NETWORK"),
            env_var::<f64>("PREWARM_DOWNLINK_MBPS"),
        );

        let cores = env_var::<usize>("PREWARM_CPU_CORES")
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()));
        let is_low_end_device = classify_low_end(
            env_bool("PREWARM_LOW_END_DEVICE"),
            env_var::<f64>("PREWARM_DEVICE_MEMORY_GB"),
            cores,
        );

        Self {
            network_speed,
            is_low_end_device,
        }
    }

    /// Both constrained at once: slow network on a low-end device. The
    /// preload scheduler suppresses unattended speculative fetches here.
    pub fn is_constrained(&self) -> bool {
        self.network_speed == NetworkSpeed::Slow && self.is_low_end_device
    }
}

fn classify_network(override_name: Option<String>, downlink_mbps: Option<f64>) -> NetworkSpeed {
    if let Some(speed) = override_name.as_deref().and_then(NetworkSpeed::parse) {
        return speed;
    }
    if let Some(mbps) = downlink_mbps {
        return NetworkSpeed::from_downlink_mbps(mbps);
    }
    NetworkSpeed::Medium
}

fn classify_low_end(forced: bool, memory_gb: Option<f64>, cores: Option<usize>) -> bool {
    if forced {
        return true;
    }
    if let Some(gb) = memory_gb {
        if gb <= LOW_END_MEMORY_GB {
            return true;
        }
    }
    matches!(cores, Some(n) if n <= LOW_END_CORES)
}
