//! Spreadsheet import.
//!
//! Import is a full replace: the attendance collections are rebuilt from the
//! matched rows and every previously stored entry is dropped.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, ImportRowError};
use crate::models::{
    AttendanceInput, AttendanceRecord, ClassAttendance, EntityKind, Facility, LabAttendance, Slot,
    parse_leading_int,
};
use crate::report::{Cell, HEADER_COUNT, HEADER_DATE, HEADER_NAME, HEADER_SLOT, HEADER_TYPE};
use crate::store::{EntityStore, generate_id};

/// One data row of an imported sheet, keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub date: Cell,
    pub name: Cell,
    pub kind: Cell,
    pub slot: Cell,
    pub count: Cell,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

/// Reads the first worksheet of an xlsx/xls/ods file into cells.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let first = sheet_names
        .first()
        .ok_or_else(|| AppError::Spreadsheet("workbook has no worksheets".to_string()))?;

    let range = workbook.worksheet_range(first)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(v) => Cell::Text(v.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Cell::Text(ts.date().format("%Y-%m-%d").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Cell::Text(s.chars().take(10).collect()),
        _ => Cell::Empty,
    }
}

/// Maps data rows to [`ImportRow`]s using the header row's column names.
/// Missing columns read as empty; blank rows are dropped.
pub fn rows_from_cells(cells: &[Vec<Cell>]) -> Vec<ImportRow> {
    let Some((header, body)) = cells.split_first() else {
        return Vec::new();
    };

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_text().trim().to_string(), i))
        .collect();
    let pick = |row: &[Cell], name: &str| {
        columns
            .get(name)
            .and_then(|&i| row.get(i))
            .cloned()
            .unwrap_or(Cell::Empty)
    };

    body.iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            let row = row.as_slice();
            ImportRow {
                date: pick(row, HEADER_DATE),
                name: pick(row, HEADER_NAME),
                kind: pick(row, HEADER_TYPE),
                slot: pick(row, HEADER_SLOT),
                count: pick(row, HEADER_COUNT),
            }
        })
        .collect()
}

/// Rebuilds both attendance collections from `rows`, matching entities by
/// name. Rows that cannot be matched are skipped and counted.
pub fn import_records(store: &mut EntityStore, rows: &[ImportRow]) -> ImportOutcome {
    let mut labs: Vec<LabAttendance> = Vec::new();
    let mut classes: Vec<ClassAttendance> = Vec::new();
    let mut outcome = ImportOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let result = match EntityKind::from_label(&row.kind.as_text()) {
            Some(EntityKind::Lab) => {
                resolve_row::<LabAttendance>(store.labs(), row).map(|r| labs.push(r))
            }
            Some(EntityKind::Class) => {
                resolve_row::<ClassAttendance>(store.classes(), row).map(|r| classes.push(r))
            }
            None => Err(ImportRowError::UnknownType(row.kind.as_text())),
        };

        match result {
            Ok(()) => outcome.imported += 1,
            Err(e) => {
                // +2: one for the header row, one for 1-based numbering
                warn!("Skipping import row {}: {}", index + 2, e);
                outcome.skipped += 1;
            }
        }
    }

    store.replace_attendance(labs, classes);
    info!(
        "Imported {} attendance rows, skipped {}",
        outcome.imported, outcome.skipped
    );
    outcome
}

fn resolve_row<R>(facilities: &[R::Owner], row: &ImportRow) -> Result<R, ImportRowError>
where
    R: AttendanceRecord,
{
    let kind = <R::Owner as Facility>::KIND;
    let name = row.name.as_text();
    let owner = facilities
        .iter()
        .find(|f| f.name() == name)
        .ok_or_else(|| ImportRowError::UnknownEntity {
            kind: kind.label(),
            name: name.clone(),
        })?;

    let date = parse_date_cell(&row.date)?;
    let slot_text = row.slot.as_text();
    let slot = Slot::parse(&slot_text)
        .filter(|s| s.kind() == kind)
        .ok_or(ImportRowError::InvalidSlot(slot_text))?;

    let count = parse_count(&row.count);
    if count < 0 {
        return Err(ImportRowError::NegativeCount(count));
    }
    if count > i64::from(owner.capacity()) {
        return Err(ImportRowError::OverCapacity {
            count,
            capacity: owner.capacity(),
        });
    }

    Ok(R::new(
        generate_id(),
        AttendanceInput {
            date,
            entity_id: owner.id().to_string(),
            slot,
            count: count as u32,
        },
    ))
}

fn parse_date_cell(cell: &Cell) -> Result<NaiveDate, ImportRowError> {
    match cell {
        Cell::Number(serial) => excel_serial_to_date(*serial)
            .ok_or_else(|| ImportRowError::InvalidDate(cell.as_text())),
        _ => {
            let text = cell.as_text();
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map_err(|_| ImportRowError::InvalidDate(text))
        }
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Leading-integer parse; anything unparsable or missing counts as 0.
pub fn parse_count(cell: &Cell) -> i64 {
    match cell {
        Cell::Number(n) if n.is_finite() => n.trunc() as i64,
        Cell::Text(s) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    }
}
