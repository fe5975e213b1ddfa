//! Content-unit extraction strategies.
//!
//! Turns a raw document into an ordered sequence of content units. Two
//! interchangeable strategies: table-cell extraction from positioned text
//! runs (higher structural fidelity) and line-based text extraction as the
//! fallback.

use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::models::config::RunsheetConfig;
use crate::models::job::ContentUnit;
use crate::pdf::{PdfProcessor, PdfSheet, TextRun};

/// Extraction strategy that produced a unit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Table-cell extraction from positioned text runs.
    Table,
    /// Line-based text extraction.
    Line,
}

impl ExtractionStrategy {
    /// Name used in diagnostics and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::Table => "table",
            ExtractionStrategy::Line => "line",
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested strategy for a parse pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyChoice {
    /// Try table mode, fall back to line mode on zero units.
    #[default]
    Auto,
    /// Table mode only.
    Table,
    /// Line mode only.
    Line,
}

impl StrategyChoice {
    /// Parse from a CLI/config string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(StrategyChoice::Auto),
            "table" => Some(StrategyChoice::Table),
            "line" => Some(StrategyChoice::Line),
            _ => None,
        }
    }
}

/// An ordered unit sequence plus the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Ordered content units.
    pub units: Vec<ContentUnit>,
    /// Strategy actually used.
    pub strategy: ExtractionStrategy,
}

/// Content-unit extractor over PDF bytes.
pub struct Extractor {
    config: RunsheetConfig,
}

impl Extractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: RunsheetConfig) -> Self {
        Self { config }
    }

    /// Extract content units from document bytes.
    ///
    /// Zero units from every attempted strategy is reported as
    /// [`ExtractError::NoContent`]; the caller marks the document rejected
    /// and moves on.
    pub fn extract(&self, data: &[u8], choice: StrategyChoice) -> Result<Extraction> {
        let mut sheet = PdfSheet::new();
        sheet.load(data)?;

        match choice {
            StrategyChoice::Table => {
                let units = self.table_units(&sheet);
                if units.is_empty() {
                    return Err(ExtractError::NoContent.into());
                }
                Ok(Extraction {
                    units,
                    strategy: ExtractionStrategy::Table,
                })
            }
            StrategyChoice::Line => {
                let units = self.line_units(&sheet)?;
                if units.is_empty() {
                    return Err(ExtractError::NoContent.into());
                }
                Ok(Extraction {
                    units,
                    strategy: ExtractionStrategy::Line,
                })
            }
            StrategyChoice::Auto => {
                let units = if self.config.extraction.prefer_table_mode {
                    self.table_units(&sheet)
                } else {
                    Vec::new()
                };

                if !units.is_empty() {
                    return Ok(Extraction {
                        units,
                        strategy: ExtractionStrategy::Table,
                    });
                }

                debug!("Table mode yielded no units, falling back to line mode");
                let units = self.line_units(&sheet).unwrap_or_default();
                if units.is_empty() {
                    return Err(ExtractError::NoContent.into());
                }
                Ok(Extraction {
                    units,
                    strategy: ExtractionStrategy::Line,
                })
            }
        }
    }

    /// Table mode: group positioned runs into rows by y-proximity and order
    /// cells within a row by x.
    fn table_units(&self, sheet: &PdfSheet) -> Vec<ContentUnit> {
        let mut units = Vec::new();
        let tolerance = self.config.extraction.row_tolerance;

        for page in 1..=self.capped_pages(sheet) {
            let runs = match sheet.extract_runs(page) {
                Ok(runs) => runs,
                Err(e) => {
                    warn!("Skipping page {}: {}", page, e);
                    continue;
                }
            };

            for (row_index, row) in group_rows(runs, tolerance).into_iter().enumerate() {
                for (column, run) in row.into_iter().enumerate() {
                    units.push(ContentUnit::cell(
                        run.text,
                        page,
                        row_index as u32,
                        column as u32,
                    ));
                }
            }
        }

        debug!("Table mode produced {} cell units", units.len());
        units
    }

    /// Line mode: whole-document text split into trimmed, non-empty lines.
    fn line_units(&self, sheet: &PdfSheet) -> Result<Vec<ContentUnit>> {
        let text = sheet.extract_text()?;
        if text.trim().len() < self.config.pdf.min_text_length {
            return Ok(Vec::new());
        }

        let units: Vec<ContentUnit> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(row, line)| ContentUnit::line(line, 1, row as u32))
            .collect();

        debug!("Line mode produced {} line units", units.len());
        Ok(units)
    }

    fn capped_pages(&self, sheet: &PdfSheet) -> u32 {
        let pages = sheet.page_count();
        if self.config.pdf.max_pages == 0 {
            pages
        } else {
            pages.min(self.config.pdf.max_pages as u32)
        }
    }
}

/// Group runs into rows: sort top-to-bottom, cluster by y within the
/// tolerance, then order each cluster left-to-right.
fn group_rows(mut runs: Vec<TextRun>, tolerance: f32) -> Vec<Vec<TextRun>> {
    // PDF y grows upward; sort descending so rows come out top-to-bottom.
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<Vec<TextRun>> = Vec::new();
    let mut current_y = f32::INFINITY;

    for run in runs {
        if (current_y - run.y).abs() <= tolerance {
            if let Some(row) = rows.last_mut() {
                row.push(run);
                continue;
            }
        }
        current_y = run.y;
        rows.push(vec![run]);
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(x: f32, y: f32, text: &str) -> TextRun {
        TextRun {
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_group_rows_by_y_proximity() {
        let runs = vec![
            run(200.0, 700.0, "TESCO STORE"),
            run(50.0, 702.0, "4269797"),
            run(50.0, 650.0, "MANCHESTER"),
        ];

        let rows = group_rows(runs, 5.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text, "4269797");
        assert_eq!(rows[0][1].text, "TESCO STORE");
        assert_eq!(rows[1][0].text, "MANCHESTER");
    }

    #[test]
    fn test_group_rows_keeps_top_to_bottom_order() {
        let runs = vec![
            run(10.0, 100.0, "bottom"),
            run(10.0, 500.0, "top"),
            run(10.0, 300.0, "middle"),
        ];

        let rows = group_rows(runs, 2.0);
        let texts: Vec<&str> = rows.iter().map(|r| r[0].text.as_str()).collect();
        assert_eq!(texts, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn test_strategy_choice_parsing() {
        assert_eq!(StrategyChoice::from_str("auto"), Some(StrategyChoice::Auto));
        assert_eq!(StrategyChoice::from_str("Table"), Some(StrategyChoice::Table));
        assert_eq!(StrategyChoice::from_str("LINE"), Some(StrategyChoice::Line));
        assert_eq!(StrategyChoice::from_str("ocr"), None);
    }
}
