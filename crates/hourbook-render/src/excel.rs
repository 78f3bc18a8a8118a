//! Excel hours report renderer
//!
//! Writes the compiled report to a single worksheet. Every period gets a
//! pair of columns, committed and not-committed hours, under a merged
//! heading:
//!
//! ```text
//! | Month:   |       Jan 2024        |       Feb 2024        |         Total         |
//! |          | Committed | Not comm. | Committed | Not comm. | Committed | Not comm. |
//! | Acme     |           |           |           |           |           |           |
//! |   Design |       3.0 |       0.0 |       0.0 |       1.5 |       3.0 |       1.5 |
//! |     Bob  |       0.0 |       0.0 |       0.0 |       1.5 |       0.0 |       1.5 |
//! | Subtotal |       3.0 |       0.0 |       0.0 |       1.5 |       3.0 |       1.5 |
//! | TOTAL    |       ... |       ... |       ... |       ... |       ... |       ... |
//! ```
//!
//! Section headings and subtotals only appear when the report has more than
//! one section. The remaining-hours projection follows the table.

use hourbook_core::HourAccumulator;
use hourbook_report::Report;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::{ensure_compiled, section_name, RenderError, Renderer};

/// Largest column index a worksheet accepts
const MAX_COLUMN: u32 = 16_383;

/// Rows above the table body: title, range, blank, two heading rows
const HEADER_ROWS: u32 = 5;

/// Excel hours report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Worksheet name
    pub sheet_name: String,
    /// Number format for hour figures
    pub number_format: String,
    /// Include a row per user under each task
    pub show_users: bool,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            sheet_name: "Hours".into(),
            number_format: "#,##0.00".into(),
            show_users: true,
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worksheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Set the number of decimal places shown for hours
    pub fn precision(mut self, precision: usize) -> Self {
        self.number_format = if precision == 0 {
            "#,##0".into()
        } else {
            format!("#,##0.{}", "0".repeat(precision))
        };
        self
    }

    /// Show or hide per-user rows
    pub fn show_users(mut self, show: bool) -> Self {
        self.show_users = show;
        self
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(&self, report: &Report) -> Result<Vec<u8>, RenderError> {
        let period_count = report.column_count() + 1;
        if 2 * period_count as u32 > MAX_COLUMN {
            return Err(RenderError::InvalidData(format!(
                "{} periods do not fit in a worksheet",
                report.column_count()
            )));
        }

        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.sheet_name)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        self.write_headers(sheet, report, &formats)?;
        let next_row = self.write_body(sheet, report, &formats)?;
        self.write_footer(sheet, report, &formats, next_row + 1)?;

        sheet.set_column_width(0, 30).ok();
        for col in 1..=(2 * period_count) as u16 {
            sheet.set_column_width(col, 12).ok();
        }
        sheet.set_freeze_panes(HEADER_ROWS, 1).ok();

        workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))
    }

    fn create_formats(&self) -> ExcelFormats {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let title = Format::new().set_bold().set_font_size(14.0);

        let text = Format::new().set_border(FormatBorder::Thin);

        let user_text = Format::new()
            .set_indent(2)
            .set_italic()
            .set_border(FormatBorder::Thin);

        let task_text = Format::new().set_indent(1).set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format(&self.number_format)
            .set_border(FormatBorder::Thin);

        let user_number = Format::new()
            .set_num_format(&self.number_format)
            .set_italic()
            .set_border(FormatBorder::Thin);

        let section = Format::new()
            .set_bold()
            .set_background_color(0xDDEBF7)
            .set_border(FormatBorder::Thin);

        let total_row = Format::new()
            .set_bold()
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        let total_number = Format::new()
            .set_bold()
            .set_num_format(&self.number_format)
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        ExcelFormats {
            header,
            title,
            text,
            user_text,
            task_text,
            number,
            user_number,
            section,
            total_row,
            total_number,
        }
    }

    fn write_headers(
        &self,
        sheet: &mut Worksheet,
        report: &Report,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        sheet
            .write_with_format(0, 0, format!("{} report", report.label()), &formats.title)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        if let Some(range) = report.display_range() {
            sheet
                .write(1, 0, range)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        let title = match report.column_title() {
            "" => "Task",
            title => title,
        };
        sheet
            .merge_range(3, 0, 4, 0, title, &formats.header)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        let mut headings = Vec::with_capacity(report.column_count() + 1);
        for index in 0..report.column_count() {
            headings.push(
                report
                    .column_heading(index)
                    .map_err(|e| RenderError::InvalidData(e.to_string()))?,
            );
        }
        headings.push("Total".to_string());

        for (index, heading) in headings.iter().enumerate() {
            let col = Self::committed_col(index);
            sheet
                .merge_range(3, col, 3, col + 1, heading, &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_with_format(4, col, "Committed", &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_with_format(4, col + 1, "Not committed", &formats.header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        Ok(())
    }

    /// Write sections, task rows and the total row; returns the next free row
    fn write_body(
        &self,
        sheet: &mut Worksheet,
        report: &Report,
        formats: &ExcelFormats,
    ) -> Result<u32, RenderError> {
        let mut row = HEADER_ROWS;
        let show_sections = report.sections.len() > 1;
        let show_users = self.show_users && !report.users.is_empty();

        for (index, section) in report.sections.iter().enumerate() {
            if show_sections {
                sheet
                    .write_with_format(row, 0, section_name(report, index), &formats.section)
                    .map_err(|e| RenderError::Format(e.to_string()))?;
                row += 1;
            }

            for row_index in section.rows() {
                let (Some(task_row), Some(task)) =
                    (report.rows.get(row_index), report.tasks.get(row_index))
                else {
                    return Err(RenderError::InvalidData(format!(
                        "section refers to missing row {row_index}"
                    )));
                };

                let cells: Vec<HourAccumulator> = task_row.cells.iter().map(|c| c.hours).collect();
                self.write_figures(
                    sheet,
                    row,
                    &task.name,
                    &cells,
                    &task_row.totals,
                    &formats.task_text,
                    &formats.number,
                )?;
                row += 1;

                if !show_users {
                    continue;
                }
                for (user_index, user) in report.users.iter().enumerate() {
                    let Some(total) = task_row.user_totals.get(user_index) else {
                        continue;
                    };
                    if !total.has_hours() {
                        continue;
                    }
                    let cells: Vec<HourAccumulator> = task_row
                        .cells
                        .iter()
                        .map(|c| c.user_data.get(user_index).copied().unwrap_or_default())
                        .collect();
                    self.write_figures(
                        sheet,
                        row,
                        &user.name,
                        &cells,
                        total,
                        &formats.user_text,
                        &formats.user_number,
                    )?;
                    row += 1;
                }
            }

            if show_sections {
                self.write_figures(
                    sheet,
                    row,
                    "Subtotal",
                    &section.cells,
                    &section.totals,
                    &formats.total_row,
                    &formats.total_number,
                )?;
                row += 1;
            }
        }

        self.write_figures(
            sheet,
            row,
            "TOTAL",
            &report.column_totals,
            &report.totals,
            &formats.total_row,
            &formats.total_number,
        )?;

        Ok(row + 1)
    }

    /// Write a labelled row of committed / not-committed pairs
    fn write_figures(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        label: &str,
        cells: &[HourAccumulator],
        total: &HourAccumulator,
        label_format: &Format,
        number_format: &Format,
    ) -> Result<(), RenderError> {
        sheet
            .write_with_format(row, 0, label, label_format)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (index, hours) in cells.iter().chain(std::iter::once(total)).enumerate() {
            let col = Self::committed_col(index);
            sheet
                .write_with_format(row, col, hours.committed, number_format)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_with_format(row, col + 1, hours.not_committed, number_format)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    fn write_footer(
        &self,
        sheet: &mut Worksheet,
        report: &Report,
        formats: &ExcelFormats,
        row: u32,
    ) -> Result<(), RenderError> {
        let (Some(actual), Some(potential)) = (
            report.total_actual_remaining,
            report.total_potential_remaining,
        ) else {
            return Ok(());
        };

        let lines = [
            ("Planned hours", report.total_duration),
            ("Remaining hours", actual),
            ("Remaining if all committed", potential),
        ];
        for (offset, (label, value)) in lines.into_iter().enumerate() {
            let r = row + offset as u32;
            sheet
                .write_with_format(r, 0, label, &formats.text)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_with_format(r, 1, value, &formats.number)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    /// Worksheet column holding committed hours for period `index`
    fn committed_col(index: usize) -> u16 {
        (1 + 2 * index) as u16
    }
}

/// Reusable cell formats
struct ExcelFormats {
    header: Format,
    title: Format,
    text: Format,
    user_text: Format,
    task_text: Format,
    number: Format,
    user_number: Format,
    section: Format,
    total_row: Format,
    total_number: Format,
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, report: &Report) -> Result<Vec<u8>, RenderError> {
        ensure_compiled(report)?;
        self.render_to_bytes(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hourbook_core::Granularity;
    use hourbook_report::ReportRequest;

    #[test]
    fn precision_sets_number_format() {
        assert_eq!(ExcelRenderer::new().precision(0).number_format, "#,##0");
        assert_eq!(ExcelRenderer::new().precision(1).number_format, "#,##0.0");
        assert_eq!(ExcelRenderer::new().precision(3).number_format, "#,##0.000");
    }

    #[test]
    fn period_columns_come_in_pairs() {
        assert_eq!(ExcelRenderer::committed_col(0), 1);
        assert_eq!(ExcelRenderer::committed_col(1), 3);
        assert_eq!(ExcelRenderer::committed_col(4), 9);
    }

    #[test]
    fn uncompiled_report_is_rejected() {
        let report = Report::new(ReportRequest::new(Granularity::Week));
        assert!(matches!(
            ExcelRenderer::new().render(&report),
            Err(RenderError::InvalidData(_))
        ));
    }
}
