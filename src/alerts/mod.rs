//! Alert rules, evaluation and re-trigger suppression

pub mod evaluator;
pub mod message;
pub mod rules;
pub mod tracker;

pub use evaluator::{evaluate, AlertTrigger, TriggerKind};
pub use message::{format_alert_message, AlertEvent};
pub use rules::{AlertConditions, AlertRule, CapitalFlowCondition};
pub use tracker::AlertTracker;
