//! Async JSON-lines reader
//!
//! Reads feed records from a file or stdin and yields snapshots. Lines that
//! cannot be decoded are skipped with a warning and counted; I/O errors end
//! the read.

use super::record::{BookBuilder, FeedRecord};
use crate::error::Result;
use crate::orderbook::snapshot::OrderBookSnapshot;
use futures::stream::{self, Stream};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Snapshot source over any buffered async reader
pub struct ReplayReader<R> {
    lines: Lines<R>,
    builder: BookBuilder,
    line_number: u64,
    records: u64,
    skipped: u64,
}

impl ReplayReader<BufReader<File>> {
    /// Open a JSON-lines file
    pub async fn open(path: impl AsRef<Path>, symbol: &str, depth: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        tracing::info!(path = %path.display(), symbol, depth, "Opened feed file");
        Ok(Self::new(BufReader::new(file), symbol, depth))
    }
}

impl ReplayReader<BufReader<Stdin>> {
    /// Read records from standard input
    pub fn stdin(symbol: &str, depth: usize) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), symbol, depth)
    }
}

impl<R: AsyncBufRead + Unpin> ReplayReader<R> {
    pub fn new(reader: R, symbol: &str, depth: usize) -> Self {
        Self {
            lines: reader.lines(),
            builder: BookBuilder::new(symbol, depth),
            line_number: 0,
            records: 0,
            skipped: 0,
        }
    }

    /// Next snapshot, `None` at end of input
    pub async fn next_snapshot(&mut self) -> Result<Option<OrderBookSnapshot>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            match FeedRecord::from_line(&line) {
                Ok(record) => {
                    self.records += 1;
                    return Ok(Some(self.builder.apply(record)));
                }
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!("Failed to parse feed line {}: {}", self.line_number, e);
                }
            }
        }
        Ok(None)
    }

    /// Records decoded so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Undecodable lines skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Adapt the reader into a stream of snapshots
    pub fn into_stream(self) -> impl Stream<Item = Result<OrderBookSnapshot>> {
        stream::try_unfold(self, |mut reader| async move {
            Ok(reader
                .next_snapshot()
                .await?
                .map(|snapshot| (snapshot, reader)))
        })
    }
}
