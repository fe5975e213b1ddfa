//! Segmentation of content units into per-job buffers.

use tracing::{debug, trace};

use super::rules::patterns::{INSTRUCTION, JOB_START, SECTION_END};
use crate::models::job::ContentUnit;

/// Buffered content for one job between its start marker and the next
/// marker or section end.
#[derive(Debug, Clone, Default)]
pub struct JobSegment {
    /// Job number from the start marker.
    pub job_number: String,

    /// Remainder of the start row after the job number.
    pub header: String,

    /// Address-eligible lines buffered before any instruction marker.
    pub body: Vec<String>,

    /// Free-text notes buffered after the first instruction marker.
    pub notes: Vec<String>,

    /// Row index of the start marker in the segmented arena.
    pub start_row: usize,
}

impl JobSegment {
    fn open(job_number: String, header: String, start_row: usize) -> Self {
        Self {
            job_number,
            header,
            body: Vec::new(),
            notes: Vec::new(),
            start_row,
        }
    }

    /// Header plus body, the lines field normalizers may read.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.header.as_str())
            .chain(self.body.iter().map(String::as_str))
            .filter(|l| !l.is_empty())
    }
}

/// One logical row of the document: a text line, or a table row with its
/// cells joined in column order.
#[derive(Debug, Clone)]
struct RowLine {
    text: String,
}

/// Segmenter: an accumulator-plus-cursor state machine over the indexed
/// unit arena. The arena itself is never mutated.
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    /// Group units into per-job segments.
    pub fn segment(&self, units: &[ContentUnit]) -> Vec<JobSegment> {
        let rows = collapse_rows(units);
        let mut segments: Vec<JobSegment> = Vec::new();
        let mut current: Option<JobSegment> = None;
        // Whether the open job still accepts address-eligible content.
        let mut address_open = true;

        for (index, row) in rows.iter().enumerate() {
            if let Some(caps) = JOB_START.captures(&row.text) {
                let job_number = caps[1].to_string();
                let header_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let header = row.text[header_end..].trim().to_string();

                match current.take() {
                    Some(open)
                        if index == open.start_row + 1
                            && open.body.is_empty()
                            && header.is_empty() =>
                    {
                        // Malformed header: a bare job number on the row
                        // right after a start marker. Keep the first open;
                        // the duplicate becomes an empty job for the
                        // validator to discard. A row with its own content
                        // is a normal job, not a malformed header.
                        trace!(
                            "Adjacent start markers at rows {} and {}; {} kept empty",
                            open.start_row, index, job_number
                        );
                        segments.push(JobSegment::open(job_number, String::new(), index));
                        current = Some(open);
                    }
                    Some(open) => {
                        segments.push(open);
                        current = Some(JobSegment::open(job_number, header, index));
                        address_open = true;
                    }
                    None => {
                        current = Some(JobSegment::open(job_number, header, index));
                        address_open = true;
                    }
                }
                continue;
            }

            if SECTION_END.is_match(&row.text) {
                if let Some(open) = current.take() {
                    segments.push(open);
                }
                continue;
            }

            let Some(open) = current.as_mut() else {
                continue;
            };

            if INSTRUCTION.is_match(&row.text) {
                // Address buffering stops for good; free text goes to notes.
                address_open = false;
                open.notes.push(row.text.clone());
            } else if address_open {
                open.body.push(row.text.clone());
            } else {
                open.notes.push(row.text.clone());
            }
        }

        if let Some(open) = current.take() {
            segments.push(open);
        }

        debug!("Segmented {} rows into {} jobs", rows.len(), segments.len());
        segments
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse units into row-lines: cells of the same (page, row) join in
/// column order; line units pass through.
fn collapse_rows(units: &[ContentUnit]) -> Vec<RowLine> {
    let mut rows: Vec<RowLine> = Vec::new();
    let mut last_pos: Option<(u32, u32)> = None;

    for unit in units {
        let pos = (unit.page, unit.row);
        if last_pos == Some(pos) && unit.column.is_some() {
            if let Some(row) = rows.last_mut() {
                if !row.text.is_empty() {
                    row.text.push(' ');
                }
                row.text.push_str(unit.text.trim());
                continue;
            }
        }
        last_pos = Some(pos);
        rows.push(RowLine {
            text: unit.text.trim().to_string(),
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<ContentUnit> {
        texts
            .iter()
            .enumerate()
            .map(|(row, text)| ContentUnit::line(*text, 1, row as u32))
            .collect()
    }

    #[test]
    fn test_basic_segmentation() {
        let units = lines(&[
            "4269797 TESCO STORE 16661UK MANCHESTER M1 1AA TECH EXCHANGE",
            "UNIT 4 TRAFFORD PARK",
            "4316807 GREGGS OLDHAM OL1 1HE SURVEY",
            "HIGH STREET",
        ]);

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].job_number, "4269797");
        assert_eq!(segments[0].body, vec!["UNIT 4 TRAFFORD PARK"]);
        assert_eq!(segments[1].job_number, "4316807");
        assert_eq!(segments[1].body, vec!["HIGH STREET"]);
    }

    #[test]
    fn test_section_end_closes_job() {
        let units = lines(&[
            "4269797 TESCO SURVEY",
            "UNIT 4",
            "Customer Signature",
            "stray footer text",
        ]);

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].body, vec!["UNIT 4"]);
    }

    #[test]
    fn test_instruction_stops_address_buffering() {
        let units = lines(&[
            "4269797 TESCO SURVEY",
            "UNIT 4 TRAFFORD PARK",
            "PLEASE CALL SITE MANAGER ON ARRIVAL",
            "MANCHESTER",
        ]);

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments[0].body, vec!["UNIT 4 TRAFFORD PARK"]);
        assert_eq!(
            segments[0].notes,
            vec!["PLEASE CALL SITE MANAGER ON ARRIVAL", "MANCHESTER"]
        );
    }

    #[test]
    fn test_adjacent_bare_marker_keeps_first() {
        let units = lines(&[
            "4269797 TESCO STORE SURVEY",
            "4269798",
            "UNIT 4 TRAFFORD PARK",
        ]);

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 2);

        // The bare duplicate is emitted as an empty job; content after it
        // still buffers into the first.
        let empty = &segments[0];
        assert_eq!(empty.job_number, "4269798");
        assert!(empty.header.is_empty());
        assert!(empty.body.is_empty());

        let kept = &segments[1];
        assert_eq!(kept.job_number, "4269797");
        assert_eq!(kept.body, vec!["UNIT 4 TRAFFORD PARK"]);
    }

    #[test]
    fn test_consecutive_full_rows_are_separate_jobs() {
        let units = lines(&[
            "4269797 TESCO STORE SURVEY",
            "4269798 GREGGS OLDHAM INSPECTION",
        ]);

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].job_number, "4269797");
        assert_eq!(segments[1].job_number, "4269798");
        assert_eq!(segments[1].header, "GREGGS OLDHAM INSPECTION");
    }

    #[test]
    fn test_preamble_rows_ignored() {
        let units = lines(&["DAILY RUN SHEET", "DRIVER: JONES", "4269797 TESCO SURVEY"]);
        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].job_number, "4269797");
    }

    #[test]
    fn test_cells_collapse_into_rows() {
        let units = vec![
            ContentUnit::cell("4269797", 1, 0, 0),
            ContentUnit::cell("TESCO STORE", 1, 0, 1),
            ContentUnit::cell("TECH EXCHANGE", 1, 0, 2),
            ContentUnit::cell("UNIT 4", 1, 1, 0),
        ];

        let segments = Segmenter::new().segment(&units);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].header, "TESCO STORE TECH EXCHANGE");
        assert_eq!(segments[0].body, vec!["UNIT 4"]);
    }
}
