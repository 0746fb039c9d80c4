pub mod export;
pub mod import;

pub use export::{Report, export_all_records, export_table};
pub use import::{ImportOutcome, ImportRow, import_records, read_workbook, rows_from_cells};

use serde::Serialize;

pub const HEADER_DATE: &str = "Date";
pub const HEADER_NAME: &str = "Lab/Class Name";
pub const HEADER_TYPE: &str = "Type";
pub const HEADER_SLOT: &str = "Slot";
pub const HEADER_COUNT: &str = "Student Count";

/// Column order of the all-records sheet; import reads the same names.
pub const RECORD_HEADERS: [&str; 5] = [HEADER_DATE, HEADER_NAME, HEADER_TYPE, HEADER_SLOT, HEADER_COUNT];

/// A spreadsheet cell value, independent of the xlsx library in use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn number(n: u32) -> Self {
        Cell::Number(f64::from(n))
    }

    /// Cell rendered as a string; whole numbers lose their fraction.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}
