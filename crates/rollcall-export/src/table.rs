//! Tabular views of attendance records shared by the renderers.

use crate::Record;
use serde_json::Value;

pub const HEADER_LABEL: &str = "Name/Roll Number";
pub const HEADER_STATUS: &str = "Status";
const UNKNOWN: &str = "Unknown";

/// The two display columns used by the PDF and DOCX exports.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTable {
    pub header: [String; 2],
    pub rows: Vec<[String; 2]>,
}

impl DisplayTable {
    /// `name` else `roll_number` else "Unknown", and `status` else "Unknown".
    pub fn from_records(records: &[Record]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                let label = record
                    .get("name")
                    .or_else(|| record.get("roll_number"))
                    .map(cell_text)
                    .unwrap_or_else(|| UNKNOWN.to_string());
                let status = record
                    .get("status")
                    .map(cell_text)
                    .unwrap_or_else(|| UNKNOWN.to_string());
                [label, status]
            })
            .collect();

        Self {
            header: [HEADER_LABEL.to_string(), HEADER_STATUS.to_string()],
            rows,
        }
    }

    /// Header plus body rows.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }
}

/// Every field present in any record, as spreadsheet columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub columns: Vec<String>,
    /// One entry per record, aligned with `columns`; `None` where the field is absent.
    pub rows: Vec<Vec<Option<Value>>>,
}

impl SheetTable {
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| columns.iter().map(|c| record.get(c).cloned()).collect())
            .collect();

        Self { columns, rows }
    }
}

/// Plain text of a JSON value: strings unquoted, everything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::Record;
    use serde_json::json;

    /// Three records: one by name, one by roll number, one with neither and no status.
    pub fn mixed_records() -> Vec<Record> {
        [
            json!({"_id": "a1", "name": "Ada", "status": "present"}),
            json!({"_id": "b2", "roll_number": "42", "status": "present"}),
            json!({"_id": "c3"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_table_fallbacks() {
        let table = DisplayTable::from_records(&fixtures::mixed_records());
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.header, ["Name/Roll Number".to_string(), "Status".to_string()]);
        assert_eq!(table.rows[0], ["Ada".to_string(), "present".to_string()]);
        assert_eq!(table.rows[1], ["42".to_string(), "present".to_string()]);
        assert_eq!(table.rows[2], ["Unknown".to_string(), "Unknown".to_string()]);
    }

    #[test]
    fn test_name_preferred_over_roll() {
        let record = json!({"name": "Grace", "roll_number": "9"}).as_object().cloned().unwrap();
        let table = DisplayTable::from_records(&[record]);
        assert_eq!(table.rows[0][0], "Grace");
    }

    #[test]
    fn test_sheet_columns_union_in_first_seen_order() {
        let sheet = SheetTable::from_records(&fixtures::mixed_records());
        assert_eq!(sheet.columns, vec!["_id", "name", "status", "roll_number"]);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1][1], None);
        assert_eq!(sheet.rows[1][3], Some(json!("42")));
        assert!(sheet.rows[2][1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(DisplayTable::from_records(&[]).row_count(), 1);
        assert!(SheetTable::from_records(&[]).columns.is_empty());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&json!(3)), "3");
        assert_eq!(cell_text(&json!(null)), "");
    }
}
