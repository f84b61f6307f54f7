pub mod alerting;
pub mod monitor;
pub mod search;

pub use alerting::AlertingSource;
pub use monitor::MonitorSource;
pub use search::SearchSource;

/// Concurrency cap for the secondary per-entity fan-out (trigger and problem
/// lookups). Keeps a large token match from turning into an unbounded burst
/// of parallel calls against the backend.
pub(crate) const SECONDARY_FAN_OUT: usize = 4;
