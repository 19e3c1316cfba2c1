/// Re-trigger suppression
///
/// A condition alerts once when it starts holding and stays quiet while it
/// keeps holding. Once it stops holding it is forgotten, so it can alert
/// again the next time it fires.
use super::evaluator::{AlertTrigger, TriggerKind};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct AlertTracker {
    active: HashMap<String, BTreeSet<TriggerKind>>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the triggers currently firing for `symbol` and return the new ones
    pub fn update(&mut self, symbol: &str, firing: Vec<AlertTrigger>) -> Vec<AlertTrigger> {
        let previous = self.active.remove(symbol).unwrap_or_default();
        let current: BTreeSet<TriggerKind> = firing.iter().map(|t| t.kind).collect();

        let fresh = firing
            .into_iter()
            .filter(|trigger| !previous.contains(&trigger.kind))
            .collect();

        if !current.is_empty() {
            self.active.insert(symbol.to_string(), current);
        }
        fresh
    }

    pub fn active(&self, symbol: &str) -> Vec<TriggerKind> {
        self.active
            .get(symbol)
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget a symbol, e.g. after its rule was edited
    pub fn reset(&mut self, symbol: &str) {
        self.active.remove(symbol);
    }
}
