//! Session drivers
//!
//! - [`replay_file`]: offline replay, every record processed in file order
//! - [`SessionRunner`] / [`run_session`]: live consumption from a
//!   [`SnapshotBuffer`] until the feed closes, the token is cancelled or the
//!   capture duration elapses
//! - [`pump`]: producer task moving reader output into a buffer

use super::buffer::SnapshotBuffer;
use super::reader::ReplayReader;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::orderbook::analytics::{AnalysisSession, MarketEvent, SessionOutput};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the live event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Why a live session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FeedClosed,
    Cancelled,
    DurationElapsed,
}

/// Output of a replayed file
#[derive(Debug, Clone)]
pub struct ReplayOutput {
    pub output: SessionOutput,

    /// Records decoded from the file
    pub records: u64,

    /// Lines that could not be decoded
    pub skipped_lines: u64,
}

/// Replay a JSON-lines file through a fresh session
///
/// Bypasses the buffer: nothing is dropped, so replays of the same file are
/// identical.
pub async fn replay_file(
    path: impl AsRef<Path>,
    symbol: &str,
    config: SessionConfig,
) -> Result<ReplayOutput> {
    let depth = config.depth;
    let session = AnalysisSession::new(config)?;
    let reader = ReplayReader::open(path, symbol, depth).await?;
    replay_reader(session, reader).await
}

/// Replay every snapshot a reader yields through `session`
pub async fn replay_reader<R>(
    mut session: AnalysisSession,
    mut reader: ReplayReader<R>,
) -> Result<ReplayOutput>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(snapshot) = reader.next_snapshot().await? {
        session.process(&snapshot);
    }

    if reader.skipped() > 0 {
        tracing::warn!(
            session_id = %session.id(),
            skipped = reader.skipped(),
            "Replay skipped undecodable lines"
        );
    }

    Ok(ReplayOutput {
        output: session.finish(),
        records: reader.records(),
        skipped_lines: reader.skipped(),
    })
}

/// Drives a session from a live buffer and broadcasts events as they happen
pub struct SessionRunner {
    session: AnalysisSession,
    events_tx: broadcast::Sender<MarketEvent>,
}

impl SessionRunner {
    pub fn new(session: AnalysisSession) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { session, events_tx }
    }

    /// Receive events as they are appended to the event log
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.events_tx.subscribe()
    }

    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    fn publish(&self, events: &[MarketEvent]) {
        for event in events {
            // No subscribers is not an error
            let _ = self.events_tx.send(event.clone());
        }
    }

    fn record_gap(&mut self, dropped: u64, fallback_timestamp: i64) {
        let after = self.session.last_timestamp().unwrap_or(fallback_timestamp);
        self.session.record_gap(dropped, after);
    }

    /// Consume the buffer until it closes, `stop` fires or `max_duration` elapses
    pub async fn run(
        mut self,
        buffer: SnapshotBuffer,
        stop: CancellationToken,
        max_duration: Option<Duration>,
    ) -> (SessionOutput, StopReason) {
        let deadline = async {
            match max_duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let reason = loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => break StopReason::Cancelled,
                _ = &mut deadline => break StopReason::DurationElapsed,
                next = buffer.recv() => match next {
                    Some(item) => {
                        if item.dropped_before > 0 {
                            self.record_gap(item.dropped_before, item.snapshot.timestamp);
                        }
                        let outcome = self.session.process(&item.snapshot);
                        self.publish(outcome.events());
                    }
                    None => break StopReason::FeedClosed,
                },
            }
        };

        let trailing_gap = buffer.take_pending_gap();
        if trailing_gap > 0 {
            self.record_gap(trailing_gap, 0);
        }

        tracing::info!(
            session_id = %self.session.id(),
            reason = ?reason,
            unprocessed = buffer.len(),
            "Live session stopping"
        );

        if let Some(unresolved) = self.session.flush() {
            self.publish(&[MarketEvent::from(unresolved)]);
        }
        let Self { session, .. } = self;

        (session.finish(), reason)
    }
}

/// Run a live session without subscribers
pub async fn run_session(
    session: AnalysisSession,
    buffer: SnapshotBuffer,
    stop: CancellationToken,
    max_duration: Option<Duration>,
) -> SessionOutput {
    SessionRunner::new(session)
        .run(buffer, stop, max_duration)
        .await
        .0
}

/// Move every snapshot from `reader` into `buffer`, closing it at end of input
///
/// Returns the number of snapshots pushed.
pub async fn pump<R>(
    mut reader: ReplayReader<R>,
    buffer: SnapshotBuffer,
    stop: CancellationToken,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut pushed = 0u64;
    let result = loop {
        let next = tokio::select! {
            _ = stop.cancelled() => break Ok(()),
            next = reader.next_snapshot() => next,
        };
        match next {
            Ok(Some(snapshot)) => {
                buffer.push(snapshot);
                pushed += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    buffer.close();
    tracing::debug!(pushed, skipped = reader.skipped(), "Feed producer finished");
    result.map(|_| pushed)
}
