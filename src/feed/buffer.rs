//! Bounded snapshot buffer between a live producer and the session
//!
//! `push` never blocks: when the buffer is full the oldest snapshot is
//! dropped and counted. The consumer receives the number of snapshots lost
//! since its previous receive together with the next snapshot.

use crate::orderbook::snapshot::OrderBookSnapshot;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// A snapshot handed to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedSnapshot {
    pub snapshot: OrderBookSnapshot,

    /// Snapshots dropped just before this one
    pub dropped_before: u64,
}

#[derive(Debug, Default)]
struct BufferState {
    queue: VecDeque<OrderBookSnapshot>,
    pending_gap: u64,
    total_dropped: u64,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    state: Mutex<BufferState>,
    notify: Notify,
}

/// Drop-oldest bounded queue; clones share the same buffer
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    shared: Arc<Shared>,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                state: Mutex::new(BufferState {
                    queue: VecDeque::with_capacity(capacity.max(1)),
                    ..Default::default()
                }),
                notify: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BufferState> {
        // Critical sections never panic mid-update; a poisoned lock is still consistent
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Enqueue a snapshot; returns `false` if an older one had to be dropped
    ///
    /// Pushing to a closed buffer discards the snapshot.
    pub fn push(&self, snapshot: OrderBookSnapshot) -> bool {
        let mut dropped_timestamp = None;
        {
            let mut state = self.state();
            if state.closed {
                return false;
            }
            if state.queue.len() >= self.shared.capacity {
                if let Some(oldest) = state.queue.pop_front() {
                    dropped_timestamp = Some(oldest.timestamp);
                    state.pending_gap += 1;
                    state.total_dropped += 1;
                }
            }
            state.queue.push_back(snapshot);
        }
        self.shared.notify.notify_one();

        if let Some(timestamp) = dropped_timestamp {
            tracing::warn!(
                dropped_timestamp = timestamp,
                capacity = self.shared.capacity,
                "Snapshot buffer full, dropped oldest snapshot"
            );
            return false;
        }
        true
    }

    /// Stop accepting snapshots; queued ones are still delivered
    pub fn close(&self) {
        self.state().closed = true;
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Wait for the next snapshot; `None` once closed and drained
    pub async fn recv(&self) -> Option<BufferedSnapshot> {
        loop {
            if let Some(item) = self.try_recv() {
                return Some(item);
            }
            if self.is_closed() && self.is_empty() {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Non-blocking receive
    pub fn try_recv(&self) -> Option<BufferedSnapshot> {
        let mut state = self.state();
        let snapshot = state.queue.pop_front()?;
        let dropped_before = std::mem::take(&mut state.pending_gap);
        Some(BufferedSnapshot {
            snapshot,
            dropped_before,
        })
    }

    /// Drops not yet reported through `recv`
    pub fn take_pending_gap(&self) -> u64 {
        std::mem::take(&mut self.state().pending_gap)
    }

    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    /// Snapshots dropped over the buffer's lifetime
    pub fn total_dropped(&self) -> u64 {
        self.state().total_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snap(timestamp: i64) -> OrderBookSnapshot {
        OrderBookSnapshot::new(timestamp, vec![], vec![])
    }

    #[test]
    fn test_overflow_drops_oldest_and_reports_gap() {
        let buffer = SnapshotBuffer::new(2);
        assert!(buffer.push(snap(1)));
        assert!(buffer.push(snap(2)));
        assert!(!buffer.push(snap(3)));
        assert!(!buffer.push(snap(4)));

        let first = buffer.try_recv().unwrap();
        assert_eq!(first.snapshot.timestamp, 3);
        assert_eq!(first.dropped_before, 2);

        let second = buffer.try_recv().unwrap();
        assert_eq!(second.snapshot.timestamp, 4);
        assert_eq!(second.dropped_before, 0);

        assert_eq!(buffer.total_dropped(), 2);
        assert!(buffer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_waits_for_producer() {
        let buffer = SnapshotBuffer::new(4);
        let producer = buffer.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.push(snap(7));
            producer.close();
        });

        let item = buffer.recv().await.unwrap();
        assert_eq!(item.snapshot.timestamp, 7);
        assert!(buffer.recv().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_buffer_drains_then_ends() {
        let buffer = SnapshotBuffer::new(4);
        buffer.push(snap(1));
        buffer.push(snap(2));
        buffer.close();
        assert!(!buffer.push(snap(3)));

        assert_eq!(buffer.recv().await.unwrap().snapshot.timestamp, 1);
        assert_eq!(buffer.recv().await.unwrap().snapshot.timestamp, 2);
        assert!(buffer.recv().await.is_none());
    }
}
