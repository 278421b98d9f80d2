// Report generator - assembles the markdown report of a finished session

use super::sections;
use super::{ReportOptions, SessionReport};
use crate::error::{DepthWatchError, Result};
use crate::orderbook::analytics::SessionOutput;
use std::time::Instant;

/// Builds session reports with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    options: ReportOptions,
}

impl ReportGenerator {
    /// Create a generator; rejects invalid options
    pub fn new(options: ReportOptions) -> Result<Self> {
        options
            .validate()
            .map_err(DepthWatchError::InvalidReportOptions)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Generate the report for a finished session
    ///
    /// `generated_at` is the wall-clock stamp shown in the header (ms).
    pub fn generate(&self, output: &SessionOutput, symbol: &str, generated_at: i64) -> SessionReport {
        let start_time = Instant::now();
        let symbol_upper = symbol.to_uppercase();
        let stats = &output.statistics;
        let max_rows = self.options.max_rows();

        // Build all sections first
        let header =
            sections::build_report_header(&symbol_upper, output.session_id, stats, generated_at);
        let all_sections = vec![
            sections::build_spread_section(stats),
            sections::build_recovery_section(stats),
            sections::build_widening_table_section(&output.events, max_rows),
            sections::build_wall_table_section(&output.events, stats, max_rows),
            sections::build_data_quality_section(stats, &output.anomalies, max_rows),
        ];

        // Assemble markdown; header always included
        let mut markdown = String::new();
        markdown.push_str(&header.render());

        let mut empty_sections = Vec::new();
        for section in &all_sections {
            if !self.options.includes(&section.name) {
                continue;
            }
            if section.content.is_err() {
                empty_sections.push(section.name.clone());
            }
            markdown.push_str(&section.render());
        }

        let generation_time_ms = start_time.elapsed().as_millis() as u64;
        if self.options.includes("footer") {
            markdown.push_str(&sections::build_report_footer(stats, generation_time_ms));
        }

        tracing::debug!(
            session_id = %output.session_id,
            symbol = %symbol_upper,
            bytes = markdown.len(),
            empty_sections = empty_sections.len(),
            "Session report generated"
        );

        SessionReport {
            markdown_content: markdown,
            symbol: symbol_upper,
            session_id: output.session_id,
            generated_at,
            empty_sections,
            generation_time_ms,
        }
    }
}
