//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use chrono::NaiveDate;
use runsheet_core::{DocumentHandle, SourceContext};

/// Build a document handle for a file.
///
/// The `DRIVER_YYYY-MM-DD.pdf` filename convention supplies the source and
/// date; explicit flags override either part. Files outside the convention
/// fall back to the bare stem as driver and today's date.
pub fn document_handle(
    path: &Path,
    driver: Option<&str>,
    customer: Option<&str>,
    date: Option<NaiveDate>,
) -> DocumentHandle {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet");

    let (stem_driver, stem_date) = match stem.rsplit_once('_') {
        Some((name, tail)) => (name, NaiveDate::parse_from_str(tail, "%Y-%m-%d").ok()),
        None => (stem, None),
    };

    DocumentHandle {
        file_ref: path.display().to_string(),
        source: SourceContext {
            driver: Some(driver.unwrap_or(stem_driver).to_string()),
            customer: customer.map(String::from),
        },
        date: date
            .or(stem_date)
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_handle_from_filename_convention() {
        let handle = document_handle(&PathBuf::from("sheets/JONES_2024-03-11.pdf"), None, None, None);
        assert_eq!(handle.source.driver.as_deref(), Some("JONES"));
        assert_eq!(handle.date, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_flags_override_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let handle = document_handle(
            &PathBuf::from("JONES_2024-03-11.pdf"),
            Some("PATEL"),
            Some("TESCO"),
            Some(date),
        );
        assert_eq!(handle.source.driver.as_deref(), Some("PATEL"));
        assert_eq!(handle.source.customer.as_deref(), Some("TESCO"));
        assert_eq!(handle.date, date);
    }

    #[test]
    fn test_unconventional_name_uses_stem() {
        let handle = document_handle(&PathBuf::from("scan001.pdf"), None, None, None);
        assert_eq!(handle.source.driver.as_deref(), Some("scan001"));
    }
}
