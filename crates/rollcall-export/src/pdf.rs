//! Letter-size PDF with a two-column grid table.
//!
//! Header row: grey fill, near-white Helvetica-Bold. Body rows: beige fill,
//! black Helvetica. Every cell is outlined and its text centered. Rows that
//! overflow a page continue on a new page under a repeated header.
//!
//! Both fonts use WinAnsiEncoding; cell text is transcoded to Windows-1252
//! and anything outside it is written as `?`.

use crate::table::DisplayTable;
use crate::ExportError;
use lopdf::content::{Content, Operation};
use encoding_rs::WINDOWS_1252;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const COLUMN_WIDTH: f32 = 180.0;
const HEADER_HEIGHT: f32 = 28.0;
const ROW_HEIGHT: f32 = 20.0;
const FONT_SIZE: f32 = 10.0;

const GREY: [f32; 3] = [0.5, 0.5, 0.5];
const WHITESMOKE: [f32; 3] = [0.96, 0.96, 0.96];
const BEIGE: [f32; 3] = [0.96, 0.96, 0.86];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

pub fn render(table: &DisplayTable) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in paginate(&table.rows) {
        let content = page_content(&table.header, chunk);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn rows_per_page() -> usize {
    ((PAGE_HEIGHT - 2.0 * MARGIN - HEADER_HEIGHT) / ROW_HEIGHT) as usize
}

/// Split body rows into pages. An empty table still yields one (header-only) page.
fn paginate(rows: &[[String; 2]]) -> Vec<&[[String; 2]]> {
    if rows.is_empty() {
        return vec![rows];
    }
    rows.chunks(rows_per_page()).collect()
}

fn page_content(header: &[String; 2], rows: &[[String; 2]]) -> Content {
    let left = (PAGE_WIDTH - 2.0 * COLUMN_WIDTH) / 2.0;
    let mut ops = Vec::new();
    let mut top = PAGE_HEIGHT - MARGIN;

    draw_row(&mut ops, left, top, HEADER_HEIGHT, header, "F2", GREY, WHITESMOKE);
    top -= HEADER_HEIGHT;

    for row in rows {
        draw_row(&mut ops, left, top, ROW_HEIGHT, row, "F1", BEIGE, BLACK);
        top -= ROW_HEIGHT;
    }

    Content { operations: ops }
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    ops: &mut Vec<Operation>,
    left: f32,
    top: f32,
    height: f32,
    cells: &[String; 2],
    font: &str,
    fill: [f32; 3],
    text_color: [f32; 3],
) {
    let bottom = top - height;

    for (i, text) in cells.iter().enumerate() {
        let x = left + i as f32 * COLUMN_WIDTH;

        ops.push(rgb("rg", fill));
        ops.push(Operation::new("re", nums(&[x, bottom, COLUMN_WIDTH, height])));
        ops.push(Operation::new("f", vec![]));

        ops.push(rgb("RG", BLACK));
        ops.push(Operation::new("w", nums(&[1.0])));
        ops.push(Operation::new("re", nums(&[x, bottom, COLUMN_WIDTH, height])));
        ops.push(Operation::new("S", vec![]));

        let text_x = x + (COLUMN_WIDTH - text_width(text)).max(0.0) / 2.0;
        let text_y = bottom + (height - FONT_SIZE) / 2.0 + 2.0;
        ops.push(rgb("rg", text_color));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.into(), FONT_SIZE.into()]));
        ops.push(Operation::new("Td", nums(&[text_x, text_y])));
        ops.push(Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]));
        ops.push(Operation::new("ET", vec![]));
    }
}

fn rgb(operator: &str, color: [f32; 3]) -> Operation {
    Operation::new(operator, nums(&color))
}

fn nums(values: &[f32]) -> Vec<Object> {
    values.iter().map(|&v| v.into()).collect()
}

fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut utf8 = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// Approximate Helvetica advance width; close enough to center short labels.
fn text_width(text: &str) -> f32 {
    text.chars().count() as f32 * FONT_SIZE * 0.55
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::mixed_records;

    fn raw_text_ops(bytes: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(bytes).unwrap();
        let mut out = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Tj") {
                if let Object::String(bytes, _) = &op.operands[0] {
                    out.push(bytes.clone());
                }
            }
        }
        out
    }

    fn text_ops(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let mut out = Vec::new();
        for (_, page_id) in doc.get_pages() {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Tj") {
                if let Object::String(bytes, _) = &op.operands[0] {
                    out.push(String::from_utf8_lossy(bytes).into_owned());
                }
            }
        }
        out
    }

    #[test]
    fn test_header_and_rows_rendered() {
        let bytes = render(&DisplayTable::from_records(&mixed_records())).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let texts = text_ops(&bytes);
        assert_eq!(texts.len(), 2 * 4);
        assert_eq!(&texts[0..2], &["Name/Roll Number", "Status"]);
        assert_eq!(&texts[2..4], &["Ada", "present"]);
        assert_eq!(&texts[4..6], &["42", "present"]);
        assert_eq!(&texts[6..8], &["Unknown", "Unknown"]);
    }

    #[test]
    fn test_empty_table_is_header_only() {
        let bytes = render(&DisplayTable::from_records(&[])).unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 1);
        assert_eq!(text_ops(&bytes), vec!["Name/Roll Number", "Status"]);
    }

    #[test]
    fn test_overflow_continues_on_new_page() {
        let per_page = rows_per_page();
        let table = DisplayTable {
            header: ["Name/Roll Number".into(), "Status".into()],
            rows: (0..per_page + 1).map(|i| [i.to_string(), "present".into()]).collect(),
        };
        let bytes = render(&table).unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 2);
        // Header repeats on the second page.
        assert_eq!(text_ops(&bytes).len(), 2 * (per_page + 1) + 2 * 2);
    }

    #[test]
    fn test_accented_names_use_win_ansi() {
        let table = DisplayTable {
            header: ["Name/Roll Number".into(), "Status".into()],
            rows: vec![
                ["José".into(), "present".into()],
                ["Zoë – 7".into(), "present".into()],
                ["李雷".into(), "present".into()],
            ],
        };
        let bytes = render(&table).unwrap();
        let texts = raw_text_ops(&bytes);
        assert_eq!(texts[2], b"Jos\xE9".to_vec());
        assert_eq!(texts[4], b"Zo\xEB \x96 7".to_vec());
        assert_eq!(texts[6], b"??".to_vec());

        let doc = Document::load_mem(&bytes).unwrap();
        let fonts = doc
            .objects
            .values()
            .filter_map(|obj| obj.as_dict().ok())
            .filter(|dict| dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Font".as_slice()))
            .collect::<Vec<_>>();
        assert_eq!(fonts.len(), 2);
        for font in fonts {
            assert_eq!(font.get(b"Encoding").and_then(Object::as_name).unwrap(), b"WinAnsiEncoding");
        }
    }
}
