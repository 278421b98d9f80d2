// Report module for session reporting
//
// This module turns a finished analysis session into a markdown report and
// into flat event rows for charting.

pub mod formatter;
pub mod generator;
pub mod rows;
pub mod sections;

// Re-export main types
pub use generator::ReportGenerator;
pub use rows::{event_rows, to_json_lines, EventRow};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every section name a report can contain, in render order
pub const SECTION_NAMES: [&str; 6] = [
    "spread_analysis",
    "recovery_analysis",
    "widening_episodes",
    "fake_walls",
    "data_quality",
    "footer",
];

/// Configuration options for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    /// List of section names to include in the report.
    /// If None or empty, all sections are included.
    pub include_sections: Option<Vec<String>>,

    /// Maximum rows per event table.
    /// Default: 100 rows, Valid range: 1-10000
    pub max_table_rows: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_sections: None, // All sections
            max_table_rows: Some(100),
        }
    }
}

impl ReportOptions {
    /// Validates the report options and returns an error if any option is invalid.
    ///
    /// # Validation Rules
    /// - `include_sections`: Every name must be one of [`SECTION_NAMES`]
    /// - `max_table_rows`: Must be between 1 and 10000
    pub fn validate(&self) -> Result<(), String> {
        if let Some(sections) = &self.include_sections {
            if let Some(unknown) = sections
                .iter()
                .find(|s| !SECTION_NAMES.contains(&s.as_str()))
            {
                return Err(format!(
                    "unknown section '{}', expected one of: {}",
                    unknown,
                    SECTION_NAMES.join(", ")
                ));
            }
        }

        if let Some(rows) = self.max_table_rows {
            if !(1..=10_000).contains(&rows) {
                return Err(format!(
                    "max_table_rows must be between 1 and 10000, got {}",
                    rows
                ));
            }
        }

        Ok(())
    }

    pub fn max_rows(&self) -> usize {
        self.max_table_rows.unwrap_or(100)
    }

    pub fn includes(&self, section_name: &str) -> bool {
        match &self.include_sections {
            None => true,                          // Include all
            Some(list) if list.is_empty() => true, // Include all
            Some(list) => list.iter().any(|s| s == section_name),
        }
    }
}

/// The complete generated session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// The complete markdown-formatted report
    pub markdown_content: String,

    /// Symbol this report was generated for (e.g., "BTCUSDT")
    pub symbol: String,

    pub session_id: Uuid,

    /// Unix timestamp (milliseconds) when report was generated
    pub generated_at: i64,

    /// Sections rendered as "no data" placeholders
    pub empty_sections: Vec<String>,

    /// Report generation duration in milliseconds
    pub generation_time_ms: u64,
}

/// Internal representation of a report section
#[derive(Debug, Clone)]
pub(crate) struct ReportSection {
    pub name: String,
    pub title: String,
    pub content: Result<String, SectionError>,
}

impl ReportSection {
    pub fn render(&self) -> String {
        match &self.content {
            Ok(markdown) => markdown.clone(),
            Err(err) => self.render_error(err),
        }
    }

    fn render_error(&self, err: &SectionError) -> String {
        format!(
            "## {}\n\n**[No Data]**\n\n{}\n\n",
            self.title,
            err.user_message()
        )
    }
}

/// Reasons a section has nothing to show
#[derive(Debug, Clone)]
pub(crate) enum SectionError {
    NoData(String),
}

impl SectionError {
    pub fn user_message(&self) -> String {
        match self {
            SectionError::NoData(what) => {
                format!("No {} events were observed during this session.", what)
            }
        }
    }
}
