//! PDF text extraction using lopdf and pdf-extract.

use lopdf::content::Content;
use lopdf::{Document, Object};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// A positioned text run from a page content stream.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Horizontal position in page space.
    pub x: f32,
    /// Vertical position in page space.
    pub y: f32,
    /// Decoded text.
    pub text: String,
}

/// PDF sheet reader backed by lopdf.
pub struct PdfSheet {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfSheet {
    /// Create an empty reader; call [`PdfProcessor::load`] before use.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("no document loaded".to_string()))
    }
}

impl Default for PdfSheet {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfSheet {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // Save decrypted document to raw_data for pdf_extract
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        Ok(text)
    }

    fn extract_runs(&self, page: u32) -> Result<Vec<TextRun>> {
        let doc = self.document()?;

        let pages = doc.get_pages();
        let page_id = pages
            .get(&page)
            .ok_or_else(|| PdfError::Parse(format!("invalid page number: {}", page)))?;

        let content_data = doc
            .get_page_content(*page_id)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        let content =
            Content::decode(&content_data).map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let mut runs = Vec::new();

        // Text cursor state across operations. Only translation components
        // are tracked; rotation is irrelevant for row/column grouping.
        let mut cursor = (0.0f32, 0.0f32);
        let mut line_start = (0.0f32, 0.0f32);
        let mut leading = 0.0f32;

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => {
                    cursor = (0.0, 0.0);
                    line_start = (0.0, 0.0);
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        let e = number(&op.operands[4]);
                        let f = number(&op.operands[5]);
                        cursor = (e, f);
                        line_start = cursor;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = number(&op.operands[0]);
                        let ty = number(&op.operands[1]);
                        line_start = (line_start.0 + tx, line_start.1 + ty);
                        cursor = line_start;
                        if op.operator == "TD" {
                            leading = -ty;
                        }
                    }
                }
                "TL" => {
                    if let Some(obj) = op.operands.first() {
                        leading = number(obj);
                    }
                }
                "T*" => {
                    line_start = (line_start.0, line_start.1 - leading);
                    cursor = line_start;
                }
                "Tj" | "'" | "\"" => {
                    // The shown string is the last operand for all three.
                    if let Some(obj) = op.operands.last() {
                        if let Some(text) = decode_string(obj) {
                            push_run(&mut runs, cursor, text);
                        }
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(parts)) = op.operands.first() {
                        let mut text = String::new();
                        for part in parts {
                            if let Some(s) = decode_string(part) {
                                text.push_str(&s);
                            }
                        }
                        push_run(&mut runs, cursor, text);
                    }
                }
                _ => {}
            }
        }

        trace!("Page {}: {} text runs", page, runs.len());
        Ok(runs)
    }
}

fn push_run(runs: &mut Vec<TextRun>, cursor: (f32, f32), text: String) {
    let text = text.trim().to_string();
    if !text.is_empty() {
        runs.push(TextRun {
            x: cursor.0,
            y: cursor.1,
            text,
        });
    }
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        _ => 0.0,
    }
}

fn decode_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => {
            // UTF-16BE with BOM, otherwise Latin-1/PDFDocEncoding.
            let text: String = if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks(2)
                    .filter(|chunk| chunk.len() == 2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                    .collect();
                String::from_utf16_lossy(&utf16)
            } else {
                bytes.iter().map(|&b| b as char).collect()
            };
            Some(text.chars().filter(|c| !c.is_control()).collect())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reader_has_no_pages() {
        let sheet = PdfSheet::new();
        assert!(sheet.document.is_none());
        assert_eq!(sheet.page_count(), 0);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut sheet = PdfSheet::new();
        assert!(sheet.load(b"not a pdf").is_err());
    }

    #[test]
    fn test_decode_string_strips_controls() {
        let obj = Object::string_literal("4269797\tTESCO");
        assert_eq!(decode_string(&obj).unwrap(), "4269797TESCO");
    }
}
