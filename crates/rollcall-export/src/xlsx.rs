//! Single-sheet XLSX workbook with one column per record field.

use crate::package::{write_package, XML_DECLARATION};
use crate::table::{cell_text, SheetTable};
use crate::{xml_escape, ExportError};
use serde_json::Value;
use std::fmt::Write as _;

const SHEET_NAME: &str = "Attendance";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

pub fn render(table: &SheetTable) -> Result<Vec<u8>, ExportError> {
    let workbook = format!(
        r#"{XML_DECLARATION}<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    );

    write_package(&[
        ("[Content_Types].xml", format!("{XML_DECLARATION}{CONTENT_TYPES}")),
        ("_rels/.rels", format!("{XML_DECLARATION}{ROOT_RELS}")),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", format!("{XML_DECLARATION}{WORKBOOK_RELS}")),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ])
}

fn sheet_xml(table: &SheetTable) -> String {
    let mut xml = format!(
        r#"{XML_DECLARATION}<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#
    );

    if !table.columns.is_empty() {
        xml.push_str(r#"<row r="1">"#);
        for (col, name) in table.columns.iter().enumerate() {
            push_text_cell(&mut xml, &cell_ref(col, 1), name);
        }
        xml.push_str("</row>");
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = i + 2;
        let _ = write!(xml, r#"<row r="{r}">"#);
        for (col, value) in row.iter().enumerate() {
            let Some(value) = value else { continue };
            let reference = cell_ref(col, r);
            match value {
                Value::Number(n) => {
                    let _ = write!(xml, r#"<c r="{reference}"><v>{n}</v></c>"#);
                }
                Value::Bool(b) => {
                    let _ = write!(xml, r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b));
                }
                other => push_text_cell(&mut xml, &reference, &cell_text(other)),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_text_cell(xml: &mut String, reference: &str, text: &str) {
    let _ = write!(
        xml,
        r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        xml_escape(text)
    );
}

/// Spreadsheet column letters: 0 → A, 25 → Z, 26 → AA.
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{row}", column_letters(col))
}
