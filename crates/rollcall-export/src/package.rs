//! OOXML package assembly shared by the XLSX and DOCX writers.

use crate::ExportError;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Zip the given `(path, xml)` parts into a single package.
pub(crate) fn write_package(parts: &[(&str, String)]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (path, xml) in parts {
            zip.start_file(*path, options)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.finish()?;
    }
    Ok(buffer)
}

#[cfg(test)]
pub(crate) fn read_part(package: &[u8], path: &str) -> String {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(path).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_contains_parts() {
        let bytes = write_package(&[
            ("a.xml", "<a/>".to_string()),
            ("dir/b.xml", "<b/>".to_string()),
        ])
        .unwrap();
        assert_eq!(&bytes[0..2], b"PK");
        assert_eq!(read_part(&bytes, "dir/b.xml"), "<b/>");
    }
}
