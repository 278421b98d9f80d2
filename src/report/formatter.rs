// Markdown helpers shared by the report sections

/// Escape a cell so anomaly details or symbols cannot break the table
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table; short rows are padded with empty cells
pub fn build_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let width = headers.len();
    let mut table = format!("| {} |\n", headers.join(" | "));
    table.push('|');
    table.push_str(&"--------|".repeat(width));
    table.push('\n');

    for row in rows {
        let cells: Vec<String> = (0..width)
            .map(|i| row.get(i).map(|c| table_cell(c)).unwrap_or_default())
            .collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    table
}

/// Unordered markdown list
pub fn build_list(items: &[String]) -> String {
    items.iter().map(|item| format!("- {}\n", item)).collect()
}

/// Markdown heading, level clamped to 1..=6
pub fn build_section_header(title: &str, level: u8) -> String {
    format!("{} {}\n\n", "#".repeat(level.clamp(1, 6) as usize), title)
}

/// Format a percentage value
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Format a millisecond duration for humans
///
/// Examples:
/// - 850 -> "850 ms"
/// - 2_000 -> "2.00 s"
/// - 90_000 -> "1m 30s"
pub fn format_duration_ms(millis: f64) -> String {
    if millis < 1_000.0 {
        format!("{:.0} ms", millis)
    } else if millis < 60_000.0 {
        format!("{:.2} s", millis / 1_000.0)
    } else {
        let total_secs = (millis / 1_000.0).round() as i64;
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    }
}

/// Format an optional value, `"n/a"` when absent
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

/// Format a timestamp as ISO 8601 UTC
pub fn format_timestamp(millis: i64) -> String {
    use chrono::{TimeZone, Utc};

    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        _ => format!("{} ms (Unix epoch)", millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_table_rows() {
        let rows = vec![
            vec!["Average Spread".to_string(), "1.25".to_string()],
            vec!["Widening Episodes".to_string()],
        ];

        let table = build_table(&["Metric", "Value"], &rows);
        assert!(table.starts_with("| Metric | Value |\n|--------|--------|\n"));
        assert!(table.contains("| Average Spread | 1.25 |"));
        assert!(table.contains("| Widening Episodes |  |"));
    }

    #[test]
    fn test_anomaly_details_are_escaped() {
        let rows = vec![vec!["crossed | bid 50010\nask 50005".to_string()]];
        let table = build_table(&["Details"], &rows);
        assert!(table.contains("| crossed \\| bid 50010 ask 50005 |"));
    }

    #[test]
    fn test_wall_summary_list() {
        let items = vec![
            "Abnormal volume: 2".to_string(),
            "Sudden disappearance: 1".to_string(),
        ];
        assert_eq!(
            build_list(&items),
            "- Abnormal volume: 2\n- Sudden disappearance: 1\n"
        );
    }

    #[test]
    fn test_section_heading_levels() {
        assert_eq!(build_section_header("Fake Walls", 2), "## Fake Walls\n\n");
        assert_eq!(build_section_header("Anomaly Log", 9), "###### Anomaly Log\n\n");
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(850.0), "850 ms");
        assert_eq!(format_duration_ms(2_000.0), "2.00 s");
        assert_eq!(format_duration_ms(90_000.0), "1m 30s");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.000 UTC");
        assert_eq!(format_optional::<i64>(None), "n/a");
    }
}
