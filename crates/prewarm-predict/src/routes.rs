//! Route transition prediction.
//!
//! A static transition table maps each route to the destinations users tend
//! to visit next, with heuristic weights. Entering a route bumps its usage
//! counter and yields a list of modules worth warming, each with a priority
//! derived from the transition's probability band. The table is pure data
//! injected at construction so a deployment can swap it (or derive it from
//! real analytics) without touching the predictor's control flow.

use std::collections::HashMap;

use parking_lot::Mutex;
use prewarm_types::{ModuleKey, PriorityTier};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Transitions at or below this probability are never acted on.
pub const MIN_PRELOAD_PROBABILITY: f64 = 0.3;

/// One outgoing edge of the transition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Destination route.
    pub target: String,
    /// Heuristic weight in `[0, 1]`. Weights for a route need not sum to 1.
    pub probability: f64,
}

impl Transition {
    pub fn new(target: impl Into<String>, probability: f64) -> Self {
        Self {
            target: target.into(),
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

/// Static mapping from a source route to likely next destinations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionTable {
    transitions: HashMap<String, Vec<Transition>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of all outgoing transitions for `source`.
    pub fn with_route(
        mut self,
        source: impl Into<String>,
        transitions: Vec<Transition>,
    ) -> Self {
        self.insert(source, transitions);
        self
    }

    pub fn insert(&mut self, source: impl Into<String>, transitions: Vec<Transition>) {
        self.transitions.insert(source.into(), transitions);
    }

    /// Outgoing transitions for a route; empty for unknown routes.
    pub fn for_route(&self, source: &str) -> &[Transition] {
        self.transitions
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Map a transition probability onto a preload priority. Stronger signals
/// warrant shorter scheduling delays.
pub fn priority_for_probability(probability: f64) -> PriorityTier {
    if probability > 0.7 {
        PriorityTier::High
    } else if probability > 0.5 {
        PriorityTier::Medium
    } else {
        PriorityTier::Low
    }
}

/// A module predicted to be needed soon.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub key: ModuleKey,
    pub priority: PriorityTier,
    pub probability: f64,
}

/// Tracks route usage and predicts which registered modules to warm next.
pub struct RoutePredictor {
    table: TransitionTable,
    /// Route -> monotonically increasing visit counter.
    stats: Mutex<HashMap<String, u64>>,
    /// Route -> backing module key. Only registered routes produce
    /// predictions; unregistered routes are tracked for stats only.
    modules: Mutex<HashMap<String, ModuleKey>>,
}

impl RoutePredictor {
    pub fn new(table: TransitionTable) -> Self {
        Self {
            table,
            stats: Mutex::new(HashMap::new()),
            modules: Mutex::new(HashMap::new()),
        }
    }

    /// Bind a route to the module key that backs it.
    pub fn register_route(&self, route: impl Into<String>, key: impl Into<ModuleKey>) {
        self.modules.lock().insert(route.into(), key.into());
    }

    /// The module key registered for a route, if any.
    pub fn module_for(&self, route: &str) -> Option<ModuleKey> {
        self.modules.lock().get(route).cloned()
    }

    /// Count a visit; returns the new total for the route.
    pub fn record_visit(&self, route: &str) -> u64 {
        let mut stats = self.stats.lock();
        let count = stats.entry(route.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn visit_count(&self, route: &str) -> u64 {
        self.stats.lock().get(route).copied().unwrap_or(0)
    }

    pub fn stats_snapshot(&self) -> HashMap<String, u64> {
        self.stats.lock().clone()
    }

    /// Modules worth warming after entering `route`: every transition above
    /// [`MIN_PRELOAD_PROBABILITY`] whose target route has a registered
    /// module, strongest first.
    pub fn predictions(&self, route: &str) -> Vec<Prediction> {
        let modules = self.modules.lock();
        let mut predictions: Vec<Prediction> = self
            .table
            .for_route(route)
            .iter()
            .filter(|t| t.probability > MIN_PRELOAD_PROBABILITY)
            .filter_map(|t| {
                let key = modules.get(&t.target)?;
                Some(Prediction {
                    key: key.clone(),
                    priority: priority_for_probability(t.probability),
                    probability: t.probability,
                })
            })
            .collect();
        predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        if !predictions.is_empty() {
            debug!(route, count = predictions.len(), "route predictions computed");
        }
        predictions
    }
}
