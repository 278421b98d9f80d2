// Flat event rows for downstream charting
//
// One row per event-log entry, with every field a chart needs and nothing
// nested, so the rows can be written as JSON lines or loaded into a table.

use crate::orderbook::analytics::{EventLog, MarketEvent, WideningTransition};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One charting row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventRow {
    /// Event timestamp (ms)
    pub timestamp: i64,

    /// `"widening"` or `"wall"`
    pub category: String,

    /// Widening phase (`opened`, `closed`, `unresolved`) or wall kind
    pub kind: String,

    /// `bid` / `ask` for wall events
    pub side: Option<String>,

    pub level_index: Option<usize>,

    /// Wall price
    #[schemars(with = "Option<String>")]
    pub price: Option<Decimal>,

    /// Peak spread of the episode
    #[schemars(with = "Option<String>")]
    pub spread: Option<Decimal>,

    /// Wall magnitude (ratio to baseline, or vanished quantity)
    pub magnitude: Option<f64>,

    pub episode_start: Option<i64>,
    pub recovery_ms: Option<i64>,
}

impl From<&MarketEvent> for EventRow {
    fn from(event: &MarketEvent) -> Self {
        match event {
            MarketEvent::Widening(transition) => {
                let episode = transition.event();
                EventRow {
                    timestamp: transition.timestamp(),
                    category: "widening".to_string(),
                    kind: transition.phase().to_string(),
                    side: None,
                    level_index: None,
                    price: None,
                    spread: Some(episode.peak_spread),
                    magnitude: None,
                    episode_start: Some(episode.start_time),
                    recovery_ms: match transition {
                        WideningTransition::Closed(e) => e.recovery_duration_ms,
                        _ => None,
                    },
                }
            }
            MarketEvent::Wall(wall) => EventRow {
                timestamp: wall.timestamp,
                category: "wall".to_string(),
                kind: wall.kind.as_str().to_string(),
                side: Some(wall.side.as_str().to_string()),
                level_index: Some(wall.level_index),
                price: Some(wall.price),
                spread: None,
                magnitude: Some(wall.magnitude),
                episode_start: None,
                recovery_ms: None,
            },
        }
    }
}

/// Rows for every event, in log order
pub fn event_rows(events: &EventLog) -> Vec<EventRow> {
    events.iter().map(EventRow::from).collect()
}

/// Serialize rows as JSON lines
pub fn to_json_lines(rows: &[EventRow]) -> serde_json::Result<String> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::analytics::{WallEvent, WallKind, WideningEvent};
    use crate::orderbook::types::Side;

    #[test]
    fn test_rows_follow_log_order() {
        let mut log = EventLog::new();
        log.append(WideningTransition::Closed(WideningEvent {
            start_time: 1_000,
            peak_spread: Decimal::from(15),
            peak_time: 2_000,
            last_observed: 3_000,
            end_time: Some(3_000),
            recovery_duration_ms: Some(2_000),
        }));
        log.append(WallEvent {
            timestamp: 4_000,
            side: Side::Bid,
            level_index: 1,
            price: Decimal::from(50_000),
            kind: WallKind::SuddenDisappearance,
            magnitude: 5.0,
            baseline_mean: Some(4.8),
        });

        let rows = event_rows(&log);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, "closed");
        assert_eq!(rows[0].recovery_ms, Some(2_000));
        assert_eq!(rows[1].category, "wall");
        assert_eq!(rows[1].side.as_deref(), Some("bid"));

        let jsonl = to_json_lines(&rows).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.contains(r#""kind":"sudden_disappearance""#));
    }

    #[test]
    fn test_row_schema_lists_chart_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(EventRow)).unwrap();
        let properties = &schema["properties"];
        for field in ["timestamp", "category", "kind", "price", "magnitude", "recovery_ms"] {
            assert!(properties.get(field).is_some(), "missing {}", field);
        }
    }
}
