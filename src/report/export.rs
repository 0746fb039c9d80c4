use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::aggregation::Aggregator;
use crate::error::AppError;
use crate::models::{AttendanceRecord, EntityKind};
use crate::report::{Cell, RECORD_HEADERS};
use crate::store::EntityStore;

/// A single-sheet workbook ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sheet_name: &'static str,
    pub file_name: String,
    /// Header row first.
    pub rows: Vec<Vec<Cell>>,
}

impl Report {
    pub fn summary(store: &EntityStore, kind: EntityKind, date: NaiveDate) -> Self {
        let (sheet_name, prefix) = match kind {
            EntityKind::Lab => ("Lab Summary", "lab-summary"),
            EntityKind::Class => ("Class Summary", "class-summary"),
        };
        Self {
            sheet_name,
            file_name: format!("{}-{}.xlsx", prefix, date.format("%Y-%m-%d")),
            rows: export_table(store, kind, date),
        }
    }

    pub fn all_records(store: &EntityStore, today: NaiveDate) -> Self {
        Self {
            sheet_name: "Attendance Data",
            file_name: format!("attendance-data-{}.xlsx", today.format("%Y-%m-%d")),
            rows: export_all_records(store),
        }
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, AppError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(self.sheet_name)?;

        for (r, row) in self.rows.iter().enumerate() {
            let r = r as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Text(s) if r == 0 => {
                        sheet.write_string_with_format(r, c, s, &header_format)?;
                    }
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(r, c, *n)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// `[Name, Capacity, ...slots..., Total]` for every entity of `kind` on `date`.
pub fn export_table(store: &EntityStore, kind: EntityKind, date: NaiveDate) -> Vec<Vec<Cell>> {
    let mut header = vec![Cell::text(format!("{} Name", kind.label())), Cell::text("Capacity")];
    header.extend(kind.slots().iter().map(|s| Cell::text(s.summary_header())));
    header.push(Cell::text("Total"));

    let mut rows = vec![header];
    for row in Aggregator::new(store).per_entity_slot_table(kind, date) {
        let mut cells = vec![Cell::text(row.name), Cell::number(row.capacity)];
        cells.extend(row.slots.iter().map(|s| Cell::number(s.count)));
        cells.push(Cell::number(row.total));
        rows.push(cells);
    }
    rows
}

/// Every attendance record of both kinds, labs first, unfiltered by date.
pub fn export_all_records(store: &EntityStore) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = vec![RECORD_HEADERS.iter().map(|h| Cell::text(*h)).collect()];
    push_records(&mut rows, store, EntityKind::Lab, store.lab_attendance());
    push_records(&mut rows, store, EntityKind::Class, store.class_attendance());
    rows
}

fn push_records<R: AttendanceRecord>(
    rows: &mut Vec<Vec<Cell>>,
    store: &EntityStore,
    kind: EntityKind,
    records: &[R],
) {
    for record in records {
        let name = store.facility_name(kind, record.entity_id()).unwrap_or_default();
        rows.push(vec![
            Cell::text(record.date().format("%Y-%m-%d").to_string()),
            Cell::text(name),
            Cell::text(kind.label()),
            Cell::text(record.slot().as_str()),
            Cell::number(record.count()),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRequest, FacilityRequest};

    fn sample_store() -> EntityStore {
        let mut store = EntityStore::new();
        let lab = store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-324A", 40))
            .unwrap();
        store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-324D", 30))
            .unwrap();
        let class = store
            .add_facility(EntityKind::Class, &FacilityRequest::new("AIML-322A", 90))
            .unwrap();
        store
            .add_attendance(EntityKind::Lab, &AttendanceRequest::new("2024-01-10", &lab, "12:10-14:10", 20))
            .unwrap();
        store
            .add_attendance(EntityKind::Class, &AttendanceRequest::new("2024-01-11", &class, "15:20-16:20", 60))
            .unwrap();
        store
    }

    #[test]
    fn test_export_table_layout() {
        let store = sample_store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let rows = export_table(&store, EntityKind::Lab, date);

        let header: Vec<String> = rows[0].iter().map(Cell::as_text).collect();
        assert_eq!(
            header,
            vec!["Lab Name", "Capacity", "9:10-11:10 AM", "12:10-2:10 PM", "2:20-4:20 PM", "Total"]
        );
        assert_eq!(rows.len(), 3);
        let first: Vec<String> = rows[1].iter().map(Cell::as_text).collect();
        assert_eq!(first, vec!["AIML-324A", "40", "0", "20", "0", "20"]);
        let second: Vec<String> = rows[2].iter().map(Cell::as_text).collect();
        assert_eq!(second, vec!["AIML-324D", "30", "0", "0", "0", "0"]);
    }

    #[test]
    fn test_export_class_table_has_six_slots() {
        let store = sample_store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let rows = export_table(&store, EntityKind::Class, date);
        assert_eq!(rows[0].len(), 9);
        assert_eq!(rows[1][7], Cell::number(60));
        assert_eq!(rows[1][8], Cell::number(60));
    }

    #[test]
    fn test_export_all_records() {
        let store = sample_store();
        let rows = export_all_records(&store);
        assert_eq!(rows.len(), 3);
        let lab: Vec<String> = rows[1].iter().map(Cell::as_text).collect();
        assert_eq!(lab, vec!["2024-01-10", "AIML-324A", "Lab", "12:10-14:10", "20"]);
        let class: Vec<String> = rows[2].iter().map(Cell::as_text).collect();
        assert_eq!(class, vec!["2024-01-11", "AIML-322A", "Class", "15:20-16:20", "60"]);
    }

    #[test]
    fn test_report_file_names() {
        let store = sample_store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(Report::summary(&store, EntityKind::Class, date).file_name, "class-summary-2024-01-10.xlsx");
        assert_eq!(Report::all_records(&store, date).sheet_name, "Attendance Data");
    }
}
