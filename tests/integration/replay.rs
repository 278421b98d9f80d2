// End-to-end replay of JSON-lines feeds

use crate::common::{config, snapshot_line};
use depth_watch::feed::{self, SessionRunner, SnapshotBuffer, StopReason};
use depth_watch::orderbook::analytics::{AnalysisSession, WallKind};
use depth_watch::report::{self, ReportGenerator};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Quiet book, one widening episode, then a bid wall that is pulled
fn write_feed() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut ts = 1_737_158_400_000i64;
    let mut line = |bids: &[(&str, &str)], asks: &[(&str, &str)]| {
        let text = snapshot_line(ts, bids, asks);
        ts += 1_000;
        text
    };

    let quiet_bids = [("50000", "0.5"), ("49999", "3.0")];
    let mut lines = Vec::new();
    for _ in 0..4 {
        lines.push(line(&quiet_bids, &[("50001", "0.5")]));
    }
    lines.push(line(&quiet_bids, &[("50015", "0.5")]));
    lines.push(line(&quiet_bids, &[("50020", "0.5")]));
    lines.push(line(&quiet_bids, &[("50002", "0.5")]));
    // 49999 x 3.0 vanishes from the bid side
    lines.push(line(&[("50000", "0.5"), ("49990", "0.5")], &[("50001", "0.5")]));
    lines.push(r#"{"type":"delta","timestamp":1737158408000,"bids":[["49990","0"]]}"#.to_string());
    lines.push("not a record".to_string());

    for text in lines {
        writeln!(file, "{}", text).unwrap();
    }
    file
}

#[tokio::test]
async fn test_replay_file_end_to_end() {
    let file = write_feed();
    let replay = feed::replay_file(file.path(), "BTCUSDT", config(3))
        .await
        .unwrap();

    assert_eq!(replay.records, 9);
    assert_eq!(replay.skipped_lines, 1);

    let stats = &replay.output.statistics;
    assert_eq!(stats.closed_episodes, 1);
    assert_eq!(stats.max_recovery_ms, Some(2_000));
    assert_eq!(stats.disappearance_events, 1);

    let wall = replay.output.events.wall_events().next().unwrap();
    assert_eq!(wall.kind, WallKind::SuddenDisappearance);
    assert_eq!(wall.price, crate::common::dec("49999"));
}

#[tokio::test]
async fn test_replay_is_byte_identical() {
    let file = write_feed();
    let first = feed::replay_file(file.path(), "BTCUSDT", config(3))
        .await
        .unwrap();
    let second = feed::replay_file(file.path(), "BTCUSDT", config(3))
        .await
        .unwrap();

    let rows_first = report::to_json_lines(&report::event_rows(&first.output.events)).unwrap();
    let rows_second = report::to_json_lines(&report::event_rows(&second.output.events)).unwrap();
    assert_eq!(rows_first, rows_second);
    assert_eq!(
        serde_json::to_value(&first.output.statistics).unwrap(),
        serde_json::to_value(&second.output.statistics).unwrap()
    );
}

#[tokio::test]
async fn test_report_from_replay() {
    let file = write_feed();
    let replay = feed::replay_file(file.path(), "btcusdt", config(3))
        .await
        .unwrap();

    let report = ReportGenerator::default().generate(&replay.output, "btcusdt", 1_737_158_500_000);
    let md = &report.markdown_content;

    assert!(md.contains("BTCUSDT"));
    assert!(md.contains("## Widening Episodes"));
    assert!(md.contains("## Fake Walls"));
    assert!(md.contains("sudden_disappearance"));
    assert!(md.contains("2025-01-18 00:00:00.000 UTC"));
    assert!(report.empty_sections.is_empty());
}

#[tokio::test]
async fn test_live_buffer_matches_replay_without_drops() {
    let file = write_feed();
    let offline = feed::replay_file(file.path(), "BTCUSDT", config(3))
        .await
        .unwrap();

    let reader = feed::ReplayReader::open(file.path(), "BTCUSDT", 10)
        .await
        .unwrap();
    let buffer = SnapshotBuffer::new(64);
    let pushed = feed::pump(reader, buffer.clone(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(pushed, 9);

    let runner = SessionRunner::new(AnalysisSession::new(config(3)).unwrap());
    let (live, reason) = runner.run(buffer, CancellationToken::new(), None).await;

    assert_eq!(reason, StopReason::FeedClosed);
    assert_eq!(
        serde_json::to_string(&live.events).unwrap(),
        serde_json::to_string(&offline.output.events).unwrap()
    );
}

#[tokio::test]
async fn test_invalid_config_fails_before_reading() {
    let mut bad = config(3);
    bad.depth = 0;
    let result = feed::replay_file("/does/not/exist.jsonl", "BTCUSDT", bad).await;
    assert!(matches!(
        result,
        Err(depth_watch::DepthWatchError::InvalidConfig(_))
    ));
}
