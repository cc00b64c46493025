//! rollcall-export — Render attendance records as downloadable documents.
//!
//! Every format is produced entirely in memory; nothing touches disk.

pub mod docx;
mod package;
pub mod pdf;
pub mod table;
pub mod xlsx;

use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

pub use table::{DisplayTable, SheetTable};

/// A stored attendance document, as read from the record store.
pub type Record = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format: {0:?} (expected excel, pdf, or word)")]
    UnsupportedFormat(String),
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("pdf: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Output formats offered by `/export?format=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Excel,
    Pdf,
    Word,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excel" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            "word" => Ok(Self::Word),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Excel => "attendance.xlsx",
            Self::Pdf => "attendance.pdf",
            Self::Word => "attendance.docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
            Self::Word => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }
}

/// Render the records in the requested format.
pub fn render(format: ExportFormat, records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Excel => xlsx::render(&SheetTable::from_records(records))?,
        ExportFormat::Pdf => pdf::render(&DisplayTable::from_records(records))?,
        ExportFormat::Word => docx::render(&DisplayTable::from_records(records))?,
    };
    tracing::info!(format = ?format, records = records.len(), bytes = bytes.len(), "attendance exported");
    Ok(bytes)
}

/// Escape text for inclusion in XML or HTML character data and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("word".parse::<ExportFormat>().unwrap(), ExportFormat::Word);
        assert!(matches!("csv".parse::<ExportFormat>(), Err(ExportError::UnsupportedFormat(f)) if f == "csv"));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(ExportFormat::Excel.file_name(), "attendance.xlsx");
        assert_eq!(ExportFormat::Pdf.file_name(), "attendance.pdf");
        assert_eq!(ExportFormat::Word.file_name(), "attendance.docx");
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
