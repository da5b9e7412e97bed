//! Priority tiers for loading and preloading.

use serde::{Deserialize, Serialize};

/// Coarse urgency classification for a registered module.
///
/// Attached to a registration, not to a single request. Drives scheduling
/// delay and visibility gating only, never correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    /// Needed immediately; preloads fire with no delay and visibility
    /// checks are skipped.
    Critical = 0,
    /// Needed soon.
    High = 1,
    /// Standard priority.
    Medium = 2,
    /// Background/prefetch.
    Low = 3,
}

impl PriorityTier {
    /// Numeric rank (lower = more urgent).
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => PriorityTier::Critical,
            1 => PriorityTier::High,
            2 => PriorityTier::Medium,
            _ => PriorityTier::Low,
        }
    }

    /// Urgent tiers bypass visibility detection and preload delays.
    pub fn is_urgent(&self) -> bool {
        matches!(self, PriorityTier::Critical | PriorityTier::High)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "critical",
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
            PriorityTier::Low => "low",
        }
    }
}

impl Default for PriorityTier {
    fn default() -> Self {
        PriorityTier::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_u8() {
        for tier in [
            PriorityTier::Critical,
            PriorityTier::High,
            PriorityTier::Medium,
            PriorityTier::Low,
        ] {
            assert_eq!(PriorityTier::from_u8(tier.as_u8()), tier);
        }
    }

    #[test]
    fn test_urgency() {
        assert!(PriorityTier::Critical.is_urgent());
        assert!(PriorityTier::High.is_urgent());
        assert!(!PriorityTier::Medium.is_urgent());
        assert!(!PriorityTier::Low.is_urgent());
    }

    #[test]
    fn test_default_is_medium() {
        assert_eq!(PriorityTier::default(), PriorityTier::Medium);
    }
}
