//! # hourbook-render
//!
//! Rendering backends for compiled hourbook reports.
//!
//! This crate provides:
//! - Fixed-width text tables for the console
//! - JSON output of the full report structure
//! - Excel workbooks (for timesheet sign-off and invoicing)
//! - The [`Renderer`] trait for custom backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use hourbook_render::{ExcelRenderer, Renderer, TextRenderer};
//!
//! let text = TextRenderer::new().precision(1).render(&report)?;
//! println!("{text}");
//!
//! let xlsx_bytes = ExcelRenderer::new().render(&report)?;
//! std::fs::write("hours.xlsx", xlsx_bytes)?;
//! ```

pub mod excel;

pub use excel::ExcelRenderer;

use hourbook_core::HourAccumulator;
use hourbook_report::Report;
use thiserror::Error;

// ============================================================================
// Renderer Trait
// ============================================================================

/// Output backend for a compiled report
pub trait Renderer {
    type Output;

    /// Render the report. Fails with [`RenderError::InvalidData`] if the
    /// report has not been compiled.
    fn render(&self, report: &Report) -> Result<Self::Output, RenderError>;
}

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub(crate) fn ensure_compiled(report: &Report) -> Result<(), RenderError> {
    if report.is_compiled() {
        Ok(())
    } else {
        Err(RenderError::InvalidData(format!(
            "report has not been compiled (stage {:?})",
            report.stage
        )))
    }
}

/// Name shown for a section: the group of its first task, if it has one
pub(crate) fn section_name(report: &Report, section: usize) -> String {
    report
        .sections
        .get(section)
        .and_then(|s| report.tasks.get(s.first_row))
        .and_then(|task| task.group.clone())
        .unwrap_or_else(|| format!("Section {}", section + 1))
}

// ============================================================================
// Text Renderer
// ============================================================================

/// Width in characters, which is what `format!` pads by
fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Plain text renderer for console output.
///
/// Cells show committed hours, followed by not-committed hours in brackets
/// when there are any. Empty cells show `-`.
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Decimal places for hour figures
    pub precision: usize,
    /// Show a line per user under each task
    pub show_users: bool,
    /// Minimum width of each figure column
    pub min_column_width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            precision: 2,
            show_users: true,
            min_column_width: 10,
        }
    }
}

/// One line of the table before layout
enum Line {
    Rule,
    Heading(String),
    Figures { label: String, values: Vec<String> },
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of decimal places
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Show or hide per-user lines
    pub fn show_users(mut self, show: bool) -> Self {
        self.show_users = show;
        self
    }

    /// Format an accumulator as "committed (not committed)"
    pub fn hours(&self, hours: &HourAccumulator) -> String {
        let p = self.precision;
        if hours.committed == 0.0 && hours.not_committed == 0.0 {
            "-".to_string()
        } else if hours.not_committed == 0.0 {
            format!("{:.*}", p, hours.committed)
        } else {
            format!("{:.*} ({:.*})", p, hours.committed, p, hours.not_committed)
        }
    }

    /// The total column is redundant when there is a single period
    fn show_total_column(report: &Report) -> bool {
        report.column_count() > 1
    }

    fn figures(
        &self,
        report: &Report,
        label: String,
        cells: impl Iterator<Item = HourAccumulator>,
        total: &HourAccumulator,
    ) -> Line {
        let mut values: Vec<String> = cells.map(|h| self.hours(&h)).collect();
        if Self::show_total_column(report) {
            values.push(self.hours(total));
        }
        Line::Figures { label, values }
    }

    fn build_lines(&self, report: &Report) -> Result<Vec<Line>, RenderError> {
        let mut lines = Vec::new();

        let mut headings = Vec::with_capacity(report.column_count() + 1);
        for index in 0..report.column_count() {
            headings.push(
                report
                    .column_heading(index)
                    .map_err(|e| RenderError::InvalidData(e.to_string()))?,
            );
        }
        if Self::show_total_column(report) {
            headings.push("Total".to_string());
        }
        let title = match report.column_title() {
            "" => "Task",
            title => title,
        };
        lines.push(Line::Figures {
            label: title.to_string(),
            values: headings,
        });
        lines.push(Line::Rule);

        let show_sections = report.sections.len() > 1;
        let show_users = self.show_users && !report.users.is_empty();

        for (index, section) in report.sections.iter().enumerate() {
            if show_sections {
                lines.push(Line::Heading(section_name(report, index)));
            }
            for row_index in section.rows() {
                let (Some(row), Some(task)) = (report.rows.get(row_index), report.tasks.get(row_index))
                else {
                    return Err(RenderError::InvalidData(format!(
                        "section refers to missing row {row_index}"
                    )));
                };
                lines.push(self.figures(
                    report,
                    format!("  {}", task.name),
                    row.cells.iter().map(|c| c.hours),
                    &row.totals,
                ));

                if show_users {
                    for (user_index, user) in report.users.iter().enumerate() {
                        let Some(total) = row.user_totals.get(user_index) else {
                            continue;
                        };
                        if !total.has_hours() {
                            continue;
                        }
                        lines.push(self.figures(
                            report,
                            format!("    {}", user.name),
                            row.cells
                                .iter()
                                .map(|c| c.user_data.get(user_index).copied().unwrap_or_default()),
                            total,
                        ));
                    }
                }
            }
            if show_sections {
                lines.push(self.figures(
                    report,
                    "  Subtotal".to_string(),
                    section.cells.iter().copied(),
                    &section.totals,
                ));
            }
        }

        lines.push(Line::Rule);
        lines.push(self.figures(
            report,
            "Total".to_string(),
            report.column_totals.iter().copied(),
            &report.totals,
        ));

        Ok(lines)
    }

    fn layout(&self, lines: &[Line]) -> String {
        let mut label_width = 0;
        let mut value_width = self.min_column_width;
        let mut value_count = 0;
        for line in lines {
            match line {
                Line::Rule => {}
                Line::Heading(text) => label_width = label_width.max(display_width(text)),
                Line::Figures { label, values } => {
                    label_width = label_width.max(display_width(label));
                    value_count = value_count.max(values.len());
                    for value in values {
                        value_width = value_width.max(display_width(value));
                    }
                }
            }
        }
        let table_width = label_width + value_count * (value_width + 2);

        let mut out = String::new();
        for line in lines {
            match line {
                Line::Rule => out.push_str(&"-".repeat(table_width)),
                Line::Heading(text) => out.push_str(text),
                Line::Figures { label, values } => {
                    out.push_str(&format!("{:<label_width$}", label));
                    for value in values {
                        out.push_str(&format!("  {:>value_width$}", value));
                    }
                }
            }
            // Trailing padding makes diffs noisy
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
            out.push('\n');
        }
        out
    }

    fn footer(&self, report: &Report) -> String {
        let p = self.precision;
        let mut out = String::new();

        out.push_str(&format!(
            "Committed: {:.*}  Not committed: {:.*}  Total: {:.*}\n",
            p,
            report.totals.committed,
            p,
            report.totals.not_committed,
            p,
            report.totals.total()
        ));

        if self.show_users && !report.users.is_empty() {
            out.push_str("\nHours by user:\n");
            let width = report.users.iter().map(|u| display_width(&u.name)).max().unwrap_or(0);
            for (user, total) in report.users.iter().zip(&report.user_column_totals) {
                out.push_str(&format!("  {:<width$}  {}\n", user.name, self.hours(total)));
            }
        }

        if let (Some(actual), Some(potential)) = (
            report.total_actual_remaining,
            report.total_potential_remaining,
        ) {
            out.push_str(&format!(
                "\nPlanned: {:.*}  Remaining: {:.*}  Remaining if all committed: {:.*}\n",
                p, report.total_duration, p, actual, p, potential
            ));
        }

        out
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, report: &Report) -> Result<String, RenderError> {
        ensure_compiled(report)?;

        let mut out = format!("{} report\n", report.label());
        if let Some(range) = report.display_range() {
            out.push_str(&range);
            out.push('\n');
        }
        out.push('\n');

        if report.tasks.is_empty() {
            out.push_str("No tasks selected.\n");
            return Ok(out);
        }

        out.push_str(&self.layout(&self.build_lines(report)?));
        out.push('\n');
        out.push_str(&self.footer(report));
        Ok(out)
    }
}

// ============================================================================
// JSON Renderer
// ============================================================================

/// Serializes the whole compiled report
#[derive(Clone, Debug, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Renderer for JsonRenderer {
    type Output = String;

    fn render(&self, report: &Report) -> Result<String, RenderError> {
        ensure_compiled(report)?;
        let json = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        json.map_err(|e| RenderError::Format(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hourbook_core::{GroupByKey, Granularity, MemoryRecordSource, RecordEntry, Task, User};
    use hourbook_report::{RangeInput, ReportRequest};
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_report(granularity: Granularity) -> Report {
        let source = MemoryRecordSource::new(vec![
            RecordEntry::committed("design", "ann", date(2024, 1, 10), 3.0),
            RecordEntry::not_committed("design", "bob", date(2024, 2, 12), 1.5),
            RecordEntry::committed("build", "bob", date(2024, 2, 20), 6.0),
        ]);
        let request = ReportRequest::new(granularity)
            .range(RangeInput::new().dates("2024-01-01", "2024-02-29"))
            .tasks(vec![
                Task::new("design").name("Design").sort_key("1").group("Acme").duration(10.0),
                Task::new("build").name("Build").sort_key("2").group("Globex"),
            ])
            .users(vec![User::new("ann").name("Ann"), User::new("bob").name("Bob")]);
        Report::compile_request(request, &source, &GroupByKey).unwrap()
    }

    #[test]
    fn hours_formatting() {
        let renderer = TextRenderer::new().precision(1);
        assert_eq!(renderer.hours(&HourAccumulator::new()), "-");
        assert_eq!(renderer.hours(&HourAccumulator::with_hours(3.0, 0.0)), "3.0");
        assert_eq!(renderer.hours(&HourAccumulator::with_hours(3.0, 1.25)), "3.0 (1.2)");
        assert_eq!(renderer.hours(&HourAccumulator::with_hours(0.0, 2.0)), "0.0 (2.0)");
    }

    #[test]
    fn uncompiled_report_is_rejected() {
        let report = Report::new(ReportRequest::new(Granularity::Month));
        let err = TextRenderer::new().render(&report).unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
        assert!(JsonRenderer::new().render(&report).is_err());
    }

    #[test]
    fn section_names_fall_back_to_numbers() {
        let report = sample_report(Granularity::Month);
        assert_eq!(section_name(&report, 0), "Acme");
        assert_eq!(section_name(&report, 1), "Globex");
        assert_eq!(section_name(&report, 7), "Section 8");
    }

    #[test]
    fn monthly_table_layout() {
        let report = sample_report(Granularity::Month);
        let text = TextRenderer::new().render(&report).unwrap();

        assert!(text.starts_with("Monthly report\n01-Jan-2024 to 29-Feb-2024\n"));
        assert!(text.contains("Month:"));
        assert!(text.contains("Jan 2024"));
        assert!(text.contains("Feb 2024"));
        assert!(text.contains("Acme\n"));
        assert!(text.contains("  Subtotal"));
        assert!(text.contains("    Bob"));
        assert!(text.contains("3.00 (1.50)"));
        assert!(text.contains("Committed: 9.00  Not committed: 1.50  Total: 10.50"));
        assert!(text.contains("Planned: 10.00  Remaining: 7.00"));
        assert!(!text.lines().any(|l| l.ends_with(' ')));
    }

    #[test]
    fn non_ascii_names_stay_aligned() {
        let source = MemoryRecordSource::new(vec![
            RecordEntry::committed("a", "zoe", date(2024, 1, 10), 1.0),
            RecordEntry::committed("b", "zoe", date(2024, 2, 10), 2.0),
        ]);
        let request = ReportRequest::new(Granularity::Month)
            .range(RangeInput::new().dates("2024-01-01", "2024-02-29"))
            .tasks(vec![
                Task::new("a").name("Café fit-out").sort_key("1"),
                Task::new("b").name("Plain").sort_key("2"),
            ])
            .users(vec![User::new("zoe").name("Zoë")]);
        let report = Report::compile_request(request, &source, &GroupByKey).unwrap();
        let text = TextRenderer::new().render(&report).unwrap();

        let cafe = text.lines().find(|l| l.starts_with("  Café")).unwrap();
        let plain = text.lines().find(|l| l.starts_with("  Plain")).unwrap();
        assert_eq!(cafe.chars().count(), plain.chars().count());
        assert_eq!(display_width("Zoë"), 3);
    }

    #[test]
    fn users_can_be_hidden() {
        let report = sample_report(Granularity::Month);
        let text = TextRenderer::new().show_users(false).render(&report).unwrap();
        assert!(!text.contains("    Ann"));
        assert!(!text.contains("Hours by user"));
    }

    #[test]
    fn totals_only_has_no_total_column() {
        let report = sample_report(Granularity::TotalsOnly);
        let text = TextRenderer::new().render(&report).unwrap();
        let header = text.lines().nth(3).unwrap();
        assert!(header.starts_with("Task"));
        assert!(header.contains("01-Jan-2024 to 29-Feb-2024"));
        assert!(!header.contains("Total"));
    }

    #[test]
    fn json_contains_report_structure() {
        let report = sample_report(Granularity::Month);
        let json = JsonRenderer::new().render(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["rows"].as_array().unwrap().len(), 2);
        assert_eq!(value["column_ranges"].as_array().unwrap().len(), 2);
        assert_eq!(value["totals"]["committed"], 9.0);
        assert_eq!(value["total_actual_remaining"], 7.0);
    }
}
