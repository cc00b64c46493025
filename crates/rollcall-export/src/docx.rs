//! Word document holding one centered, bordered two-column table.

use crate::package::{write_package, XML_DECLARATION};
use crate::table::DisplayTable;
use crate::{xml_escape, ExportError};
use std::fmt::Write as _;

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Half-points: 12pt body text.
const BODY_SIZE: u32 = 24;
/// Twentieths of a point: two 3-inch columns.
const COLUMN_WIDTH: u32 = 4320;

pub fn render(table: &DisplayTable) -> Result<Vec<u8>, ExportError> {
    write_package(&[
        ("[Content_Types].xml", format!("{XML_DECLARATION}{CONTENT_TYPES}")),
        ("_rels/.rels", format!("{XML_DECLARATION}{ROOT_RELS}")),
        ("word/document.xml", document_xml(table)),
    ])
}

fn document_xml(table: &DisplayTable) -> String {
    let mut xml = format!(
        r#"{XML_DECLARATION}<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:tbl>"#
    );

    xml.push_str(r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/><w:jc w:val="center"/><w:tblBorders>"#);
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        let _ = write!(xml, r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#);
    }
    xml.push_str("</w:tblBorders></w:tblPr>");
    let _ = write!(
        xml,
        r#"<w:tblGrid><w:gridCol w:w="{COLUMN_WIDTH}"/><w:gridCol w:w="{COLUMN_WIDTH}"/></w:tblGrid>"#
    );

    push_row(&mut xml, &table.header, true);
    for row in &table.rows {
        push_row(&mut xml, row, false);
    }

    xml.push_str("</w:tbl><w:p/></w:body></w:document>");
    xml
}

fn push_row(xml: &mut String, cells: &[String; 2], header: bool) {
    xml.push_str("<w:tr>");
    for text in cells {
        let _ = write!(xml, r#"<w:tc><w:tcPr><w:tcW w:w="{COLUMN_WIDTH}" w:type="dxa"/>"#);
        if header {
            xml.push_str(r#"</w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr>"#);
        } else {
            let _ = write!(
                xml,
                r#"<w:vAlign w:val="center"/></w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:sz w:val="{BODY_SIZE}"/></w:rPr>"#
            );
        }
        let _ = write!(xml, r#"<w:t xml:space="preserve">{}</w:t></w:r></w:p></w:tc>"#, xml_escape(text));
    }
    xml.push_str("</w:tr>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::read_part;
    use crate::table::fixtures::mixed_records;

    #[test]
    fn test_table_has_header_plus_one_row_per_record() {
        let bytes = render(&DisplayTable::from_records(&mixed_records())).unwrap();
        let doc = read_part(&bytes, "word/document.xml");

        assert_eq!(doc.matches("<w:tr>").count(), 4);
        assert_eq!(doc.matches("<w:b/>").count(), 2);
        // Every cell paragraph is centered, header included.
        assert_eq!(doc.matches(r#"<w:pPr><w:jc w:val="center"/></w:pPr>"#).count(), 8);
        assert!(doc.contains(">Name/Roll Number</w:t>"));
        assert!(doc.contains(">Ada</w:t>"));
        assert!(doc.contains(">42</w:t>"));
        assert_eq!(doc.matches(">Unknown</w:t>").count(), 2);
    }

    #[test]
    fn test_body_cells_centered_at_twelve_point() {
        let bytes = render(&DisplayTable::from_records(&mixed_records())).unwrap();
        let doc = read_part(&bytes, "word/document.xml");
        assert_eq!(doc.matches(r#"<w:vAlign w:val="center"/>"#).count(), 6);
        assert_eq!(doc.matches(r#"<w:sz w:val="24"/>"#).count(), 6);
        assert!(doc.contains(r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/><w:jc w:val="center"/>"#));
        assert!(doc.contains(r#"<w:insideV w:val="single""#));
    }

    #[test]
    fn test_empty_records_header_only() {
        let bytes = render(&DisplayTable::from_records(&[])).unwrap();
        assert_eq!(read_part(&bytes, "word/document.xml").matches("<w:tr>").count(), 1);
        assert!(read_part(&bytes, "[Content_Types].xml").contains("wordprocessingml.document.main+xml"));
    }
}
