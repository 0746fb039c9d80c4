//! In-memory entity collections.
//!
//! Labs and classes keep insertion order. Attendance collections are stored
//! unsorted; listings are sorted by their consumers.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    AttendanceInput, AttendanceRecord, AttendanceRequest, ClassAttendance, ClassRoom, EntityKind,
    Facility, FacilityInput, FacilityRequest, Lab, LabAttendance,
};

/// All four collections, as exchanged with the local and remote stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub labs: Vec<Lab>,
    pub classes: Vec<ClassRoom>,
    pub lab_attendance: Vec<LabAttendance>,
    pub class_attendance: Vec<ClassAttendance>,
}

const DEFAULT_LABS: [&str; 5] = ["AIML-324A", "AIML-324D", "AIML-323A", "AIML-323B", "AIML-325M"];
const DEFAULT_CLASSES: [&str; 4] = ["AIML-322A", "AIML-322B", "AIML-324B", "AIML-324C"];

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    labs: Vec<Lab>,
    classes: Vec<ClassRoom>,
    lab_attendance: Vec<LabAttendance>,
    class_attendance: Vec<ClassAttendance>,
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from loaded data. Attendance with a slot of the other
    /// kind, or pointing at a missing lab/class, is dropped.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let lab_attendance = retain_consistent(snapshot.lab_attendance, &snapshot.labs);
        let class_attendance = retain_consistent(snapshot.class_attendance, &snapshot.classes);
        Self {
            labs: snapshot.labs,
            classes: snapshot.classes,
            lab_attendance,
            class_attendance,
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            labs: self.labs.clone(),
            classes: self.classes.clone(),
            lab_attendance: self.lab_attendance.clone(),
            class_attendance: self.class_attendance.clone(),
        }
    }

    /// Fills empty lab/class collections with the default rooms.
    /// Returns true if anything was added.
    pub fn seed_defaults(&mut self) -> bool {
        let mut seeded = false;
        if self.labs.is_empty() {
            for name in DEFAULT_LABS {
                self.labs.push(Lab::new(
                    generate_id(),
                    FacilityInput {
                        name: name.to_string(),
                        capacity: EntityKind::Lab.max_capacity(),
                    },
                ));
            }
            seeded = true;
        }
        if self.classes.is_empty() {
            for name in DEFAULT_CLASSES {
                self.classes.push(ClassRoom::new(
                    generate_id(),
                    FacilityInput {
                        name: name.to_string(),
                        capacity: EntityKind::Class.max_capacity(),
                    },
                ));
            }
            seeded = true;
        }
        seeded
    }

    pub fn labs(&self) -> &[Lab] {
        &self.labs
    }

    pub fn classes(&self) -> &[ClassRoom] {
        &self.classes
    }

    pub fn lab_attendance(&self) -> &[LabAttendance] {
        &self.lab_attendance
    }

    pub fn class_attendance(&self) -> &[ClassAttendance] {
        &self.class_attendance
    }

    pub fn find_lab(&self, id: &str) -> Option<&Lab> {
        self.labs.iter().find(|l| l.id == id)
    }

    pub fn find_class(&self, id: &str) -> Option<&ClassRoom> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn find_lab_attendance(&self, id: &str) -> Option<&LabAttendance> {
        self.lab_attendance.iter().find(|a| a.id == id)
    }

    pub fn find_class_attendance(&self, id: &str) -> Option<&ClassAttendance> {
        self.class_attendance.iter().find(|a| a.id == id)
    }

    /// Name of the lab or class with `id`, if it exists.
    pub fn facility_name(&self, kind: EntityKind, id: &str) -> Option<&str> {
        match kind {
            EntityKind::Lab => self.find_lab(id).map(|l| l.name.as_str()),
            EntityKind::Class => self.find_class(id).map(|c| c.name.as_str()),
        }
    }

    pub fn add_facility(&mut self, kind: EntityKind, req: &FacilityRequest) -> Result<String, AppError> {
        let input = req.validate(kind)?;
        let id = generate_id();
        match kind {
            EntityKind::Lab => self.labs.push(Lab::new(id.clone(), input)),
            EntityKind::Class => self.classes.push(ClassRoom::new(id.clone(), input)),
        }
        Ok(id)
    }

    pub fn update_facility(
        &mut self,
        kind: EntityKind,
        id: &str,
        req: &FacilityRequest,
    ) -> Result<(), AppError> {
        let input = req.validate(kind)?;
        match kind {
            EntityKind::Lab => update_facility_in(&mut self.labs, id, input),
            EntityKind::Class => update_facility_in(&mut self.classes, id, input),
        }
    }

    /// Removes a lab or class together with its attendance records.
    /// Returns how many attendance records were cascaded.
    pub fn remove_facility(&mut self, kind: EntityKind, id: &str) -> Result<usize, AppError> {
        match kind {
            EntityKind::Lab => remove_facility_in(&mut self.labs, &mut self.lab_attendance, id),
            EntityKind::Class => {
                remove_facility_in(&mut self.classes, &mut self.class_attendance, id)
            }
        }
    }

    pub fn add_attendance(
        &mut self,
        kind: EntityKind,
        req: &AttendanceRequest,
    ) -> Result<String, AppError> {
        let input = req.parse(kind)?;
        let id = generate_id();
        match kind {
            EntityKind::Lab => {
                check_capacity(&self.labs, &input)?;
                self.lab_attendance.push(LabAttendance::new(id.clone(), input));
            }
            EntityKind::Class => {
                check_capacity(&self.classes, &input)?;
                self.class_attendance.push(ClassAttendance::new(id.clone(), input));
            }
        }
        Ok(id)
    }

    pub fn update_attendance(
        &mut self,
        kind: EntityKind,
        id: &str,
        req: &AttendanceRequest,
    ) -> Result<(), AppError> {
        let input = req.parse(kind)?;
        match kind {
            EntityKind::Lab => update_attendance_in(&self.labs, &mut self.lab_attendance, id, input),
            EntityKind::Class => {
                update_attendance_in(&self.classes, &mut self.class_attendance, id, input)
            }
        }
    }

    pub fn remove_attendance(&mut self, kind: EntityKind, id: &str) -> Result<(), AppError> {
        match kind {
            EntityKind::Lab => remove_record_in(&mut self.lab_attendance, id),
            EntityKind::Class => remove_record_in(&mut self.class_attendance, id),
        }
    }

    /// Swaps in whole attendance collections. Used by spreadsheet import.
    pub fn replace_attendance(&mut self, labs: Vec<LabAttendance>, classes: Vec<ClassAttendance>) {
        self.lab_attendance = labs;
        self.class_attendance = classes;
    }
}

fn retain_consistent<R: AttendanceRecord>(records: Vec<R>, owners: &[R::Owner]) -> Vec<R> {
    let kind = <R::Owner as Facility>::KIND;
    records
        .into_iter()
        .filter(|r| {
            if r.slot().kind() != kind {
                warn!(
                    "Dropping {} attendance {} with {} slot {}",
                    kind.label().to_lowercase(),
                    r.id(),
                    r.slot().kind().label().to_lowercase(),
                    r.slot()
                );
                return false;
            }
            if !owners.iter().any(|o| o.id() == r.entity_id()) {
                warn!(
                    "Dropping {} attendance {} for missing {} {}",
                    kind.label().to_lowercase(),
                    r.id(),
                    kind.label().to_lowercase(),
                    r.entity_id()
                );
                return false;
            }
            true
        })
        .collect()
}

fn update_facility_in<F: Facility>(
    items: &mut [F],
    id: &str,
    input: FacilityInput,
) -> Result<(), AppError> {
    let item = items
        .iter_mut()
        .find(|f| f.id() == id)
        .ok_or(AppError::NotFound)?;
    item.apply(input);
    Ok(())
}

fn remove_facility_in<R: AttendanceRecord>(
    items: &mut Vec<R::Owner>,
    records: &mut Vec<R>,
    id: &str,
) -> Result<usize, AppError> {
    let index = items
        .iter()
        .position(|f| f.id() == id)
        .ok_or(AppError::NotFound)?;
    items.remove(index);

    let before = records.len();
    records.retain(|r| r.entity_id() != id);
    Ok(before - records.len())
}

/// Capacity is only checked at entry time; shrinking a facility later does
/// not touch existing records.
fn check_capacity<F: Facility>(items: &[F], input: &AttendanceInput) -> Result<(), AppError> {
    let owner = items
        .iter()
        .find(|f| f.id() == input.entity_id)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown {} \"{}\"",
                F::KIND.label().to_lowercase(),
                input.entity_id
            ))
        })?;

    if input.count > owner.capacity() {
        return Err(AppError::Validation(format!(
            "Student count cannot exceed {} capacity ({})!",
            F::KIND.label().to_lowercase(),
            owner.capacity()
        )));
    }
    Ok(())
}

fn update_attendance_in<R: AttendanceRecord>(
    items: &[R::Owner],
    records: &mut [R],
    id: &str,
    input: AttendanceInput,
) -> Result<(), AppError> {
    let index = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or(AppError::NotFound)?;
    check_capacity(items, &input)?;
    records[index] = R::new(id.to_string(), input);
    Ok(())
}

fn remove_record_in<R: AttendanceRecord>(records: &mut Vec<R>, id: &str) -> Result<(), AppError> {
    let index = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or(AppError::NotFound)?;
    records.remove(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_lab() -> (EntityStore, String) {
        let mut store = EntityStore::new();
        let id = store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-324A", 40))
            .expect("Failed to add lab");
        (store, id)
    }

    #[test]
    fn test_add_and_find_lab() {
        let (store, id) = store_with_lab();
        let lab = store.find_lab(&id).expect("Lab not found");
        assert_eq!(lab.name, "AIML-324A");
        assert_eq!(lab.capacity, 40);
        assert!(store.find_class(&id).is_none());
    }

    #[test]
    fn test_invalid_capacity_leaves_store_unchanged() {
        let (mut store, id) = store_with_lab();
        let before = store.to_snapshot();

        assert!(store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("Too big", 41))
            .is_err());
        assert!(store
            .update_facility(EntityKind::Lab, &id, &FacilityRequest::new("AIML-324A", 50))
            .is_err());

        assert_eq!(store.to_snapshot(), before);
    }

    #[test]
    fn test_update_missing_facility_is_not_found() {
        let (mut store, _) = store_with_lab();
        let result = store.update_facility(EntityKind::Lab, "nope", &FacilityRequest::new("X", 1));
        assert!(matches!(result, Err(AppError::NotFound)));
        assert!(matches!(
            store.remove_facility(EntityKind::Class, "nope"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let (mut store, id) = store_with_lab();
        let other = store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-324D", 30))
            .unwrap();
        assert_ne!(id, other);

        store
            .update_facility(EntityKind::Lab, &id, &FacilityRequest::new("Renamed", 20))
            .unwrap();
        assert_eq!(store.find_lab(&id).unwrap().name, "Renamed");
        assert_eq!(store.labs()[0].id, id);
    }

    #[test]
    fn test_count_over_capacity_rejected() {
        let (mut store, id) = store_with_lab();
        let result = store.add_attendance(
            EntityKind::Lab,
            &AttendanceRequest::new("2024-01-10", &id, "9:10-11:10", 41),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.lab_attendance().is_empty());

        let entry = store
            .add_attendance(
                EntityKind::Lab,
                &AttendanceRequest::new("2024-01-10", &id, "9:10-11:10", 40),
            )
            .unwrap();
        let result = store.update_attendance(
            EntityKind::Lab,
            &entry,
            &AttendanceRequest::new("2024-01-10", &id, "9:10-11:10", 41),
        );
        assert!(result.is_err());
        assert_eq!(store.find_lab_attendance(&entry).unwrap().count, 40);
    }

    #[test]
    fn test_attendance_requires_existing_facility() {
        let mut store = EntityStore::new();
        let result = store.add_attendance(
            EntityKind::Class,
            &AttendanceRequest::new("2024-01-10", "ghost", "9:10-10:10", 1),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_capacity_shrink_keeps_existing_records() {
        let (mut store, id) = store_with_lab();
        store
            .add_attendance(
                EntityKind::Lab,
                &AttendanceRequest::new("2024-01-10", &id, "9:10-11:10", 35),
            )
            .unwrap();
        store
            .update_facility(EntityKind::Lab, &id, &FacilityRequest::new("AIML-324A", 10))
            .unwrap();
        assert_eq!(store.lab_attendance()[0].count, 35);
    }

    #[test]
    fn test_remove_cascades_only_dependents() {
        let mut store = EntityStore::new();
        let a = store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("A", 40))
            .unwrap();
        let b = store
            .add_facility(EntityKind::Lab, &FacilityRequest::new("B", 40))
            .unwrap();
        let c = store
            .add_facility(EntityKind::Class, &FacilityRequest::new("C", 90))
            .unwrap();
        for (lab, count) in [(&a, 1), (&a, 2), (&b, 3)] {
            store
                .add_attendance(
                    EntityKind::Lab,
                    &AttendanceRequest::new("2024-01-10", lab, "12:10-14:10", count),
                )
                .unwrap();
        }
        store
            .add_attendance(
                EntityKind::Class,
                &AttendanceRequest::new("2024-01-10", &c, "9:10-10:10", 4),
            )
            .unwrap();

        let removed = store.remove_facility(EntityKind::Lab, &a).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.labs().len(), 1);
        assert_eq!(store.lab_attendance().len(), 1);
        assert_eq!(store.lab_attendance()[0].lab_id, b);
        assert_eq!(store.class_attendance().len(), 1);
    }

    #[test]
    fn test_remove_attendance() {
        let (mut store, id) = store_with_lab();
        let entry = store
            .add_attendance(
                EntityKind::Lab,
                &AttendanceRequest::new("2024-01-10", &id, "14:20-16:20", 5),
            )
            .unwrap();
        store.remove_attendance(EntityKind::Lab, &entry).unwrap();
        assert!(store.lab_attendance().is_empty());
        assert!(matches!(
            store.remove_attendance(EntityKind::Lab, &entry),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_seed_defaults_only_fills_empty_collections() {
        let (mut store, _) = store_with_lab();
        assert!(store.seed_defaults());
        assert_eq!(store.labs().len(), 1);
        assert_eq!(store.classes().len(), 4);
        assert!(store.classes().iter().all(|c| c.capacity == 90));
        assert!(!store.seed_defaults());
    }

    #[test]
    fn test_loaded_snapshot_drops_inconsistent_attendance() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "labs": [{"id": "l1", "name": "AIML-324A", "capacity": 40}],
            "classes": [{"id": "c1", "name": "AIML-322A", "capacity": 90}],
            "labAttendance": [
                {"id": "a1", "date": "2024-01-10", "labId": "l1", "slot": "9:10-11:10", "count": 20},
                {"id": "a2", "date": "2024-01-10", "labId": "l1", "slot": "9:10-10:10", "count": 25},
                {"id": "a3", "date": "2024-01-10", "labId": "ghost", "slot": "9:10-11:10", "count": 7}
            ],
            "classAttendance": [
                {"id": "b1", "date": "2024-01-10", "classId": "c1", "slot": "12:10-14:10", "count": 3},
                {"id": "b2", "date": "2024-01-10", "classId": "c1", "slot": "12:10-13:10", "count": 60}
            ]
        }))
        .expect("Failed to parse snapshot");

        let store = EntityStore::from_snapshot(snapshot);
        let lab_ids: Vec<&str> = store.lab_attendance().iter().map(|a| a.id.as_str()).collect();
        let class_ids: Vec<&str> = store.class_attendance().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(lab_ids, vec!["a1"]);
        assert_eq!(class_ids, vec!["b2"]);
        assert_eq!(store.labs().len(), 1);

        // every kept record has an owner, so exported rows carry names
        let rows = crate::report::export_all_records(&store);
        assert!(rows.iter().skip(1).all(|r| !r[1].is_empty()));
    }
}
