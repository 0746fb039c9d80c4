//! Attendance aggregation over the current store contents.
//!
//! Every figure is built from [`Aggregator::summarize_slot`]; entities are
//! always visited in store order.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AttendanceRecord, EntityKind, Facility, Slot};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub lab_attendance: u32,
    pub class_attendance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCount {
    pub slot: Slot,
    pub count: u32,
}

/// One entity's per-slot breakdown for a date. Backs both the dashboard
/// table and the summary export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTableRow {
    pub entity_id: String,
    pub name: String,
    pub capacity: u32,
    pub slots: Vec<SlotCount>,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedSeries {
    pub name: String,
    pub counts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTotal {
    pub name: String,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListing {
    pub id: String,
    pub date: NaiveDate,
    pub entity_id: String,
    pub entity_name: String,
    pub slot: Slot,
    pub slot_label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub total_labs: usize,
    pub total_classes: usize,
    pub totals: DashboardTotals,
    pub lab_table: Vec<SlotTableRow>,
    pub class_table: Vec<SlotTableRow>,
    pub lab_series: Vec<GroupedSeries>,
    pub class_series: Vec<GroupedSeries>,
    pub lab_slot_totals: Vec<SlotCount>,
    pub class_slot_totals: Vec<SlotCount>,
    pub lab_totals: Vec<EntityTotal>,
    pub class_totals: Vec<EntityTotal>,
}

pub struct Aggregator<'a> {
    store: &'a EntityStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// Sum of `count` over records matching entity, date and slot exactly.
    /// The slot decides which collection is searched.
    pub fn summarize_slot(&self, entity_id: &str, date: NaiveDate, slot: Slot) -> u32 {
        match slot.kind() {
            EntityKind::Lab => sum_matching(self.store.lab_attendance(), entity_id, date, slot),
            EntityKind::Class => {
                sum_matching(self.store.class_attendance(), entity_id, date, slot)
            }
        }
    }

    pub fn total_for_entity_on_date(&self, kind: EntityKind, entity_id: &str, date: NaiveDate) -> u32 {
        kind.slots()
            .iter()
            .map(|slot| self.summarize_slot(entity_id, date, *slot))
            .sum()
    }

    pub fn dashboard_totals(&self, date: NaiveDate) -> DashboardTotals {
        DashboardTotals {
            lab_attendance: self.kind_total(EntityKind::Lab, date),
            class_attendance: self.kind_total(EntityKind::Class, date),
        }
    }

    fn kind_total(&self, kind: EntityKind, date: NaiveDate) -> u32 {
        self.entity_ids(kind)
            .iter()
            .map(|id| self.total_for_entity_on_date(kind, id, date))
            .sum()
    }

    fn entity_ids(&self, kind: EntityKind) -> Vec<&'a str> {
        match kind {
            EntityKind::Lab => self.store.labs().iter().map(|l| l.id()).collect(),
            EntityKind::Class => self.store.classes().iter().map(|c| c.id()).collect(),
        }
    }

    /// One row per entity, including entities with no attendance.
    pub fn per_entity_slot_table(&self, kind: EntityKind, date: NaiveDate) -> Vec<SlotTableRow> {
        match kind {
            EntityKind::Lab => self.table_rows(self.store.labs(), date),
            EntityKind::Class => self.table_rows(self.store.classes(), date),
        }
    }

    fn table_rows<F: Facility>(&self, facilities: &[F], date: NaiveDate) -> Vec<SlotTableRow> {
        facilities
            .iter()
            .map(|facility| {
                let slots: Vec<SlotCount> = F::KIND
                    .slots()
                    .iter()
                    .map(|slot| SlotCount {
                        slot: *slot,
                        count: self.summarize_slot(facility.id(), date, *slot),
                    })
                    .collect();
                let total = slots.iter().map(|s| s.count).sum();
                SlotTableRow {
                    entity_id: facility.id().to_string(),
                    name: facility.name().to_string(),
                    capacity: facility.capacity(),
                    slots,
                    total,
                }
            })
            .collect()
    }

    /// Per-slot counts for entities with at least one record on `date`.
    /// Unlike [`Self::per_entity_slot_table`], idle entities are left out.
    pub fn grouped_series(&self, kind: EntityKind, date: NaiveDate) -> Vec<GroupedSeries> {
        let active = |id: &str| match kind {
            EntityKind::Lab => has_record_on(self.store.lab_attendance(), id, date),
            EntityKind::Class => has_record_on(self.store.class_attendance(), id, date),
        };

        self.per_entity_slot_table(kind, date)
            .into_iter()
            .filter(|row| active(&row.entity_id))
            .map(|row| GroupedSeries {
                name: row.name,
                counts: row.slots.iter().map(|s| s.count).collect(),
            })
            .collect()
    }

    /// Students per slot across every entity of `kind`.
    pub fn slot_totals(&self, kind: EntityKind, date: NaiveDate) -> Vec<SlotCount> {
        let ids = self.entity_ids(kind);
        kind.slots()
            .iter()
            .map(|slot| SlotCount {
                slot: *slot,
                count: ids
                    .iter()
                    .map(|id| self.summarize_slot(id, date, *slot))
                    .sum(),
            })
            .collect()
    }

    pub fn entity_totals(&self, kind: EntityKind, date: NaiveDate) -> Vec<EntityTotal> {
        self.per_entity_slot_table(kind, date)
            .into_iter()
            .map(|row| EntityTotal {
                name: row.name,
                total: row.total,
            })
            .collect()
    }

    /// Attendance records for display: newest date first, then by name.
    pub fn attendance_listing(&self, kind: EntityKind) -> Vec<AttendanceListing> {
        let mut listing = match kind {
            EntityKind::Lab => self.listing_of(self.store.lab_attendance(), kind),
            EntityKind::Class => self.listing_of(self.store.class_attendance(), kind),
        };
        listing.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.entity_name.cmp(&b.entity_name))
        });
        listing
    }

    fn listing_of<R: AttendanceRecord>(&self, records: &[R], kind: EntityKind) -> Vec<AttendanceListing> {
        records
            .iter()
            .map(|r| AttendanceListing {
                id: r.id().to_string(),
                date: r.date(),
                entity_id: r.entity_id().to_string(),
                entity_name: self
                    .store
                    .facility_name(kind, r.entity_id())
                    .unwrap_or_default()
                    .to_string(),
                slot: r.slot(),
                slot_label: r.slot().twelve_hour_label(),
                count: r.count(),
            })
            .collect()
    }

    pub fn summary(&self, date: NaiveDate) -> DashboardSummary {
        DashboardSummary {
            date,
            total_labs: self.store.labs().len(),
            total_classes: self.store.classes().len(),
            totals: self.dashboard_totals(date),
            lab_table: self.per_entity_slot_table(EntityKind::Lab, date),
            class_table: self.per_entity_slot_table(EntityKind::Class, date),
            lab_series: self.grouped_series(EntityKind::Lab, date),
            class_series: self.grouped_series(EntityKind::Class, date),
            lab_slot_totals: self.slot_totals(EntityKind::Lab, date),
            class_slot_totals: self.slot_totals(EntityKind::Class, date),
            lab_totals: self.entity_totals(EntityKind::Lab, date),
            class_totals: self.entity_totals(EntityKind::Class, date),
        }
    }
}

fn sum_matching<R: AttendanceRecord>(records: &[R], entity_id: &str, date: NaiveDate, slot: Slot) -> u32 {
    records
        .iter()
        .filter(|r| r.entity_id() == entity_id && r.date() == date && r.slot() == slot)
        .map(|r| r.count())
        .sum()
}

fn has_record_on<R: AttendanceRecord>(records: &[R], entity_id: &str, date: NaiveDate) -> bool {
    records
        .iter()
        .any(|r| r.entity_id() == entity_id && r.date() == date)
}
