// Section builders for the session report
//
// Each function builds one section from a finished session's output.
// Sections without data return SectionError so the report still renders.

use super::formatter;
use super::{ReportSection, SectionError};
use crate::orderbook::analytics::{
    AnomalyLog, EventLog, SessionStatistics, WallKind, WideningTransition,
};
use uuid::Uuid;

/// Build report header section with metadata
///
/// Includes: Symbol, session id, covered time range, generation timestamp
pub fn build_report_header(
    symbol: &str,
    session_id: Uuid,
    stats: &SessionStatistics,
    generated_at: i64,
) -> ReportSection {
    let mut content = String::new();

    content.push_str(&formatter::build_section_header(
        &format!("Spread & Liquidity Report: {}", symbol),
        1,
    ));

    let range = match (stats.first_timestamp, stats.last_timestamp) {
        (Some(first), Some(last)) => format!(
            "{} → {}",
            formatter::format_timestamp(first),
            formatter::format_timestamp(last)
        ),
        _ => "no healthy snapshots".to_string(),
    };

    let headers = vec!["Metric", "Value"];
    let rows = vec![
        vec!["Symbol".to_string(), symbol.to_string()],
        vec!["Session".to_string(), session_id.to_string()],
        vec!["Time Range".to_string(), range],
        vec![
            "Snapshots".to_string(),
            format!(
                "{} seen, {} healthy",
                stats.snapshots_seen, stats.healthy_snapshots
            ),
        ],
        vec![
            "Generated At".to_string(),
            formatter::format_timestamp(generated_at),
        ],
    ];

    content.push_str(&formatter::build_table(&headers, &rows));
    content.push('\n');

    ReportSection {
        name: "header".to_string(),
        title: "Session Report".to_string(),
        content: Ok(content),
    }
}

/// Build spread analysis section
///
/// Includes: Average/min/max spread over healthy snapshots, episode counts
pub fn build_spread_section(stats: &SessionStatistics) -> ReportSection {
    let content = match stats.avg_spread {
        Some(avg) => {
            let mut section = formatter::build_section_header("Spread Analysis", 2);

            let headers = vec!["Metric", "Value"];
            let rows = vec![
                vec!["Average Spread".to_string(), avg.round_dp(8).normalize().to_string()],
                vec![
                    "Minimum Spread".to_string(),
                    formatter::format_optional(stats.min_spread),
                ],
                vec![
                    "Maximum Spread".to_string(),
                    formatter::format_optional(stats.max_spread),
                ],
                vec![
                    "Widening Episodes".to_string(),
                    stats.total_episodes().to_string(),
                ],
            ];

            section.push_str(&formatter::build_table(&headers, &rows));
            section.push('\n');
            section.push_str(
                "*Crossed and malformed snapshots are excluded from spread figures.*\n\n",
            );
            Ok(section)
        }
        None => Err(SectionError::NoData("healthy snapshot".to_string())),
    };

    ReportSection {
        name: "spread_analysis".to_string(),
        title: "Spread Analysis".to_string(),
        content,
    }
}

/// Build recovery analysis section
///
/// Includes: Closed vs unresolved episodes, average and longest recovery
pub fn build_recovery_section(stats: &SessionStatistics) -> ReportSection {
    let content = if stats.total_episodes() == 0 {
        Err(SectionError::NoData("spread widening".to_string()))
    } else {
        let mut section = formatter::build_section_header("Recovery Analysis", 2);

        let headers = vec!["Metric", "Value"];
        let rows = vec![
            vec![
                "Closed Episodes".to_string(),
                stats.closed_episodes.to_string(),
            ],
            vec![
                "Unresolved Episodes".to_string(),
                stats.unresolved_episodes.to_string(),
            ],
            vec![
                "Average Recovery".to_string(),
                stats
                    .avg_recovery_ms
                    .map(formatter::format_duration_ms)
                    .unwrap_or_else(|| "n/a".to_string()),
            ],
            vec![
                "Longest Recovery".to_string(),
                stats
                    .max_recovery_ms
                    .map(|ms| formatter::format_duration_ms(ms as f64))
                    .unwrap_or_else(|| "n/a".to_string()),
            ],
        ];

        section.push_str(&formatter::build_table(&headers, &rows));
        section.push('\n');

        if stats.unresolved_episodes > 0 {
            section.push_str(
                "⚠️ **Unresolved:** the session ended while the spread was still wide; \
                 these episodes have no recovery time and are not averaged.\n\n",
            );
        }
        Ok(section)
    };

    ReportSection {
        name: "recovery_analysis".to_string(),
        title: "Recovery Analysis".to_string(),
        content,
    }
}

/// Build widening episode table (one row per finalized episode)
pub fn build_widening_table_section(events: &EventLog, max_rows: usize) -> ReportSection {
    let episodes: Vec<&WideningTransition> = events.widening_episodes().collect();

    let content = if episodes.is_empty() {
        Err(SectionError::NoData("spread widening".to_string()))
    } else {
        let mut section = formatter::build_section_header("Widening Episodes", 2);

        let headers = vec!["Start", "Peak Spread", "Peak At", "End", "Recovery", "Status"];
        let rows: Vec<Vec<String>> = episodes
            .iter()
            .take(max_rows)
            .map(|transition| {
                let e = transition.event();
                let status = match transition {
                    WideningTransition::Closed(_) => "✅ Recovered",
                    _ => "⏳ Unresolved",
                };
                vec![
                    formatter::format_timestamp(e.start_time),
                    e.peak_spread.to_string(),
                    formatter::format_timestamp(e.peak_time),
                    e.end_time
                        .map(formatter::format_timestamp)
                        .unwrap_or_else(|| "-".to_string()),
                    e.recovery_duration_ms
                        .map(|ms| formatter::format_duration_ms(ms as f64))
                        .unwrap_or_else(|| "-".to_string()),
                    status.to_string(),
                ]
            })
            .collect();

        section.push_str(&formatter::build_table(&headers, &rows));
        section.push('\n');
        push_truncation_note(&mut section, episodes.len(), max_rows);
        Ok(section)
    };

    ReportSection {
        name: "widening_episodes".to_string(),
        title: "Widening Episodes".to_string(),
        content,
    }
}

/// Build fake wall table
///
/// Includes: Per-kind counts followed by one row per wall event
pub fn build_wall_table_section(
    events: &EventLog,
    stats: &SessionStatistics,
    max_rows: usize,
) -> ReportSection {
    let content = if stats.wall_events() == 0 {
        Err(SectionError::NoData("fake wall".to_string()))
    } else {
        let mut section = formatter::build_section_header("Fake Walls", 2);

        let summary = vec![
            format!(
                "🧱 Abnormal volume: {}",
                stats.abnormal_volume_events
            ),
            format!(
                "💨 Sudden disappearance: {}",
                stats.disappearance_events
            ),
        ];
        section.push_str(&formatter::build_list(&summary));
        section.push('\n');

        let headers = vec!["Time", "Side", "Level", "Price", "Kind", "Magnitude"];
        let rows: Vec<Vec<String>> = events
            .wall_events()
            .take(max_rows)
            .map(|wall| {
                let magnitude = match wall.kind {
                    WallKind::AbnormalVolume => format!("{:.2}× baseline", wall.magnitude),
                    WallKind::SuddenDisappearance => format!("{} vanished", wall.magnitude),
                };
                vec![
                    formatter::format_timestamp(wall.timestamp),
                    wall.side.to_string(),
                    wall.level_index.to_string(),
                    wall.price.to_string(),
                    wall.kind.to_string(),
                    magnitude,
                ]
            })
            .collect();

        section.push_str(&formatter::build_table(&headers, &rows));
        section.push('\n');
        push_truncation_note(&mut section, stats.wall_events() as usize, max_rows);
        Ok(section)
    };

    ReportSection {
        name: "fake_walls".to_string(),
        title: "Fake Walls".to_string(),
        content,
    }
}

/// Build data quality section
///
/// Includes: Skipped snapshot counts by cause and the first anomalies
pub fn build_data_quality_section(
    stats: &SessionStatistics,
    anomalies: &AnomalyLog,
    max_rows: usize,
) -> ReportSection {
    let mut section = formatter::build_section_header("Data Quality", 2);

    let (status, status_emoji) = match stats.healthy_ratio() {
        Some(ratio) if ratio >= 99.0 => ("✅ Clean", "🟢"),
        Some(ratio) if ratio >= 90.0 => ("⚠️ Degraded", "🟡"),
        Some(_) => ("❌ Poor", "🔴"),
        None => ("❌ No data", "🔴"),
    };
    section.push_str(&format!(
        "{} **Overall Status:** {}\n\n",
        status_emoji, status
    ));

    let headers = vec!["Metric", "Value"];
    let rows = vec![
        vec![
            "Healthy Snapshots".to_string(),
            format!(
                "{} ({})",
                stats.healthy_snapshots,
                stats
                    .healthy_ratio()
                    .map(formatter::format_percentage)
                    .unwrap_or_else(|| "n/a".to_string())
            ),
        ],
        vec![
            "Crossed Books".to_string(),
            stats.crossed_snapshots.to_string(),
        ],
        vec![
            "Malformed Snapshots".to_string(),
            stats.malformed_snapshots.to_string(),
        ],
        vec![
            "Out-of-Order Snapshots".to_string(),
            stats.out_of_order_snapshots.to_string(),
        ],
        vec![
            "Dropped (buffer overflow)".to_string(),
            stats.dropped_snapshots.to_string(),
        ],
    ];
    section.push_str(&formatter::build_table(&headers, &rows));
    section.push('\n');

    if !anomalies.is_empty() {
        section.push_str(&formatter::build_section_header("Anomaly Log", 3));
        let rows: Vec<Vec<String>> = anomalies
            .iter()
            .take(max_rows)
            .map(|entry| {
                vec![
                    formatter::format_timestamp(entry.timestamp),
                    entry.anomaly.kind().to_string(),
                    entry.anomaly.to_string(),
                ]
            })
            .collect();
        section.push_str(&formatter::build_table(&["Time", "Kind", "Details"], &rows));
        section.push('\n');
        push_truncation_note(&mut section, anomalies.len(), max_rows);
    }

    ReportSection {
        name: "data_quality".to_string(),
        title: "Data Quality".to_string(),
        content: Ok(section),
    }
}

/// Build report footer with generation metadata
pub fn build_report_footer(stats: &SessionStatistics, generation_time_ms: u64) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("### Report Metadata\n\n");

    let headers = vec!["Metric", "Value"];
    let rows = vec![
        vec![
            "Generation Time".to_string(),
            format!("{} ms", generation_time_ms),
        ],
        vec!["Events".to_string(), (stats.total_episodes() + stats.wall_events()).to_string()],
        vec!["Report Format".to_string(), "Markdown".to_string()],
    ];

    footer.push_str(&formatter::build_table(&headers, &rows));
    footer.push('\n');
    footer.push_str("*Generated by depth-watch*\n");
    footer.push('\n');

    footer
}

fn push_truncation_note(section: &mut String, total: usize, shown: usize) {
    if total > shown {
        section.push_str(&format!("*Showing first {} of {} rows.*\n\n", shown, total));
    }
}
