//! Monitoring loop, on-demand updates and the events they publish

mod events;
mod service;
mod snapshot;

pub use events::{CycleSummary, ManualUpdateStatus, MonitorEvent};
pub use service::Monitor;
pub use snapshot::AnalysisSnapshot;
