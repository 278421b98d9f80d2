//! Order book microstructure analytics
//!
//! This module turns a sequence of snapshots into market events:
//! - Spread widening episodes with hysteresis and recovery time
//! - Fake wall detection (abnormal volume, sudden disappearance)
//! - Ordered event log and data-quality anomaly channel
//! - Session statistics for reporting

pub mod baseline;
pub mod event_log;
pub mod session;
pub mod spread;
pub mod stats;
pub mod types;
pub mod walls;

pub use event_log::{AnomalyLog, EventLog};
pub use session::{AnalysisSession, ProcessOutcome, SessionOutput};
pub use spread::{SpreadMonitor, SpreadState};
pub use stats::SessionStatistics;
pub use types::*;
pub use walls::WallDetector;
