// Detector scenarios through the public session API

use crate::common::{config, dec, snapshot};
use depth_watch::orderbook::analytics::{
    AnalysisSession, MarketEvent, ProcessOutcome, WallKind, WideningTransition,
};
use depth_watch::orderbook::{Side, SnapshotAnomaly};

fn spread_book(timestamp: i64, spread: i64) -> depth_watch::orderbook::OrderBookSnapshot {
    let ask = (50_000 + spread).to_string();
    snapshot(timestamp, &[("50000", "1")], &[(ask.as_str(), "1")])
}

#[test]
fn test_widening_episode_lifecycle() {
    let mut session = AnalysisSession::new(config(20)).unwrap();
    for (i, spread) in [1, 1, 1, 12, 15, 9, 1, 1].iter().enumerate() {
        session.process(&spread_book(i as i64 * 1_000, *spread));
    }
    let output = session.finish();

    let transitions: Vec<_> = output.events.widening_transitions().collect();
    assert_eq!(transitions.len(), 2);
    assert!(matches!(transitions[0], WideningTransition::Opened(e) if e.start_time == 3_000));

    let WideningTransition::Closed(closed) = transitions[1] else {
        panic!("expected closed episode");
    };
    assert_eq!(closed.peak_spread, dec("15"));
    assert_eq!(closed.end_time, Some(5_000));
    assert_eq!(closed.recovery_duration_ms, Some(2_000));
    assert_eq!(output.statistics.avg_recovery_ms, Some(2_000.0));
}

#[test]
fn test_abnormal_volume_against_baseline() {
    let mut session = AnalysisSession::new(config(20)).unwrap();

    // Bid level 0 baseline: mean 2.0, population std-dev 0.3
    for i in 0..20 {
        let qty = if i % 2 == 0 { "1.7" } else { "2.3" };
        let outcome = session.process(&snapshot(i, &[("50000", qty)], &[("50001", "2")]));
        assert!(outcome.events().is_empty(), "no events during warm-up");
    }

    let outcome = session.process(&snapshot(20, &[("50000", "9.0")], &[("50001", "2")]));
    let walls: Vec<_> = outcome
        .events()
        .iter()
        .filter_map(|e| match e {
            MarketEvent::Wall(w) => Some(w),
            _ => None,
        })
        .collect();

    assert_eq!(walls.len(), 1);
    assert_eq!(walls[0].kind, WallKind::AbnormalVolume);
    assert_eq!(walls[0].side, Side::Bid);
    assert_eq!(walls[0].level_index, 0);
    assert!((walls[0].magnitude - 4.5).abs() < 1e-9);
}

#[test]
fn test_sudden_disappearance_of_large_level() {
    let mut session = AnalysisSession::new(config(3)).unwrap();
    let bids = [("50005", "0.5"), ("50000", "5.0"), ("49990", "0.5")];
    for ts in 0..3 {
        session.process(&snapshot(ts * 100, &bids, &[("50006", "0.5")]));
    }

    let outcome = session.process(&snapshot(
        300,
        &[("50005", "0.5"), ("49990", "0.5")],
        &[("50006", "0.5")],
    ));

    let [MarketEvent::Wall(wall)] = outcome.events() else {
        panic!("expected exactly one wall event, got {:?}", outcome.events());
    };
    assert_eq!(wall.kind, WallKind::SuddenDisappearance);
    assert_eq!(wall.price, dec("50000"));
    assert_eq!(wall.magnitude, 5.0);
}

#[test]
fn test_crossed_book_is_recorded_and_ignored() {
    let mut session = AnalysisSession::new(config(3)).unwrap();
    session.process(&spread_book(0, 1));

    let outcome = session.process(&snapshot(1_000, &[("50010", "1")], &[("50005", "1")]));
    assert!(matches!(
        outcome,
        ProcessOutcome::Skipped(SnapshotAnomaly::CrossedBook { .. })
    ));
    assert!(!session.spread_monitor().is_widening());
    assert_eq!(session.wall_detector().baseline_len(Side::Bid, 0), 1);

    let output = session.finish();
    assert!(output.events.is_empty());
    assert_eq!(output.anomalies.len(), 1);
    // The crossed sample does not drag the average below zero
    assert_eq!(output.statistics.min_spread, Some(dec("1")));
}

#[test]
fn test_session_end_leaves_episode_unresolved() {
    let mut session = AnalysisSession::new(config(3)).unwrap();
    session.process(&spread_book(0, 1));
    session.process(&spread_book(60_000, 12));
    session.process(&spread_book(75_000, 20));
    session.process(&spread_book(90_000, 14));
    let output = session.finish();

    let last = output.events.all().last().unwrap();
    let MarketEvent::Widening(WideningTransition::Unresolved(episode)) = last else {
        panic!("expected unresolved episode");
    };
    assert_eq!(episode.peak_spread, dec("20"));
    assert_eq!(episode.last_observed - episode.start_time, 30_000);
    assert_eq!(output.statistics.unresolved_episodes, 1);
    assert_eq!(output.statistics.avg_recovery_ms, None);
}

#[test]
fn test_snapshot_without_asks_changes_nothing() {
    let mut session = AnalysisSession::new(config(3)).unwrap();
    session.process(&spread_book(0, 1));
    let bid_baseline = session.wall_detector().baseline_len(Side::Bid, 0);

    let outcome = session.process(&snapshot(1_000, &[("50000", "1")], &[]));

    assert!(!outcome.is_accepted());
    assert_eq!(session.wall_detector().baseline_len(Side::Bid, 0), bid_baseline);
    assert_eq!(session.anomalies().count_kind("malformed"), 1);
}

#[test]
fn test_episodes_never_overlap() {
    let mut session = AnalysisSession::new(depth_watch::config::SessionConfig {
        recovery_threshold: dec("4"),
        ..config(5)
    })
    .unwrap();

    // Deterministic zig-zag of spreads between 1 and 19
    for i in 0..500i64 {
        let spread = 1 + (i * 7 + i / 3) % 19;
        session.process(&spread_book(i * 250, spread));
    }
    let output = session.finish();

    let mut open = false;
    let mut last_end = i64::MIN;
    for transition in output.events.widening_transitions() {
        match transition {
            WideningTransition::Opened(e) => {
                assert!(!open, "episode opened while another was open");
                assert!(e.start_time >= last_end);
                open = true;
            }
            WideningTransition::Closed(e) => {
                assert!(open);
                assert!(e.recovery_duration_ms.unwrap() >= 0);
                last_end = e.end_time.unwrap();
                open = false;
            }
            WideningTransition::Unresolved(_) => {
                assert!(open);
                open = false;
            }
        }
    }
    assert!(!open);
    assert!(output.statistics.closed_episodes > 0);
}
