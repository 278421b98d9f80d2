//! Snapshot feeds
//!
//! JSON-lines decoding, local book building, the bounded live buffer and the
//! drivers that push snapshots through an [`AnalysisSession`].
//!
//! [`AnalysisSession`]: crate::orderbook::analytics::AnalysisSession

pub mod buffer;
pub mod reader;
pub mod record;
pub mod runner;

pub use buffer::{BufferedSnapshot, SnapshotBuffer};
pub use reader::ReplayReader;
pub use record::{BookBuilder, DepthDelta, FeedRecord, LOCAL_BOOK_LEVELS};
pub use runner::{
    pump, replay_file, replay_reader, run_session, ReplayOutput, SessionRunner, StopReason,
};
