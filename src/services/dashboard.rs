use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::aggregation::{Aggregator, DashboardSummary};
use crate::error::AppError;
use crate::models::{AttendanceRequest, EntityKind, FacilityRequest};
use crate::persistence::{Collection, LoadSource, PersistenceAdapter, RemoteChange};
use crate::report::{ImportOutcome, ImportRow, Report, import_records, read_workbook, rows_from_cells};
use crate::services::Notifier;
use crate::store::EntityStore;

/// The command surface over the store. Each command runs to completion
/// (mutation, local save, notice) before returning; the remote push is
/// started afterwards and never awaited by the caller.
pub struct Dashboard {
    store: EntityStore,
    persistence: PersistenceAdapter,
    notifier: Notifier,
    source: LoadSource,
    last_sync: Option<JoinHandle<()>>,
}

impl Dashboard {
    pub async fn load(
        persistence: PersistenceAdapter,
        notifier: Notifier,
        seed_defaults: bool,
    ) -> Result<Self, AppError> {
        let (snapshot, source) = persistence.load().await?;
        let mut store = EntityStore::from_snapshot(snapshot);

        let mut seeded: Vec<RemoteChange> = Vec::new();
        let (had_labs, had_classes) = (!store.labs().is_empty(), !store.classes().is_empty());
        if seed_defaults && store.seed_defaults() {
            info!("Seeded default labs and classes");
            if !had_labs {
                seeded.extend(store.labs().iter().map(|lab| RemoteChange::Create {
                    collection: Collection::Labs,
                    body: to_body(lab),
                }));
            }
            if !had_classes {
                seeded.extend(store.classes().iter().map(|class| RemoteChange::Create {
                    collection: Collection::Classes,
                    body: to_body(class),
                }));
            }
        }
        if let Err(e) = persistence.save_local(&store.to_snapshot()).await {
            error!("Failed to save local copy after load: {}", e);
        }

        let last_sync = if seeded.is_empty() {
            None
        } else {
            Some(persistence.sync_remote(seeded, notifier.clone(), None))
        };

        Ok(Self {
            store,
            persistence,
            notifier,
            source,
            last_sync,
        })
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(&self.store)
    }

    pub fn summary(&self, date: NaiveDate) -> DashboardSummary {
        self.aggregator().summary(date)
    }

    pub fn facility_json(&self, kind: EntityKind, id: &str) -> Option<Value> {
        match kind {
            EntityKind::Lab => self.store.find_lab(id).map(to_body),
            EntityKind::Class => self.store.find_class(id).map(to_body),
        }
    }

    pub fn attendance_json(&self, kind: EntityKind, id: &str) -> Option<Value> {
        match kind {
            EntityKind::Lab => self.store.find_lab_attendance(id).map(to_body),
            EntityKind::Class => self.store.find_class_attendance(id).map(to_body),
        }
    }

    pub async fn add_facility(&mut self, kind: EntityKind, req: &FacilityRequest) -> Result<String, AppError> {
        let result = self.store.add_facility(kind, req);
        let id = self.reject(result)?;
        let body = self.facility_json(kind, &id).unwrap_or(Value::Null);
        let name = self.store.facility_name(kind, &id).unwrap_or_default().to_string();

        self.commit(
            vec![RemoteChange::Create {
                collection: Collection::facilities(kind),
                body,
            }],
            format!("{} \"{}\" added successfully!", kind.label(), name),
        )
        .await;
        Ok(id)
    }

    pub async fn edit_facility(
        &mut self,
        kind: EntityKind,
        id: &str,
        req: &FacilityRequest,
    ) -> Result<(), AppError> {
        let result = self.store.update_facility(kind, id, req);
        self.reject(result)?;
        let body = self.facility_json(kind, id).unwrap_or(Value::Null);
        let name = self.store.facility_name(kind, id).unwrap_or_default().to_string();

        self.commit(
            vec![RemoteChange::Update {
                collection: Collection::facilities(kind),
                id: id.to_string(),
                body,
            }],
            format!("{} \"{}\" updated successfully!", kind.label(), name),
        )
        .await;
        Ok(())
    }

    /// Deletes a lab or class and its attendance. Returns the number of
    /// attendance records removed with it.
    pub async fn delete_facility(&mut self, kind: EntityKind, id: &str) -> Result<usize, AppError> {
        let name = self.store.facility_name(kind, id).unwrap_or_default().to_string();
        let result = self.store.remove_facility(kind, id);
        let cascaded = self.reject(result)?;

        self.commit(
            vec![RemoteChange::Delete {
                collection: Collection::facilities(kind),
                id: id.to_string(),
            }],
            format!("{} \"{}\" deleted successfully!", kind.label(), name),
        )
        .await;
        Ok(cascaded)
    }

    pub async fn add_attendance(&mut self, kind: EntityKind, req: &AttendanceRequest) -> Result<String, AppError> {
        let result = self.store.add_attendance(kind, req);
        let id = self.reject(result)?;
        let body = self.attendance_json(kind, &id).unwrap_or(Value::Null);

        self.commit(
            vec![RemoteChange::Create {
                collection: Collection::attendance(kind),
                body,
            }],
            format!("{} attendance entry added successfully!", kind.label()),
        )
        .await;
        Ok(id)
    }

    pub async fn edit_attendance(
        &mut self,
        kind: EntityKind,
        id: &str,
        req: &AttendanceRequest,
    ) -> Result<(), AppError> {
        let result = self.store.update_attendance(kind, id, req);
        self.reject(result)?;
        let body = self.attendance_json(kind, id).unwrap_or(Value::Null);

        self.commit(
            vec![RemoteChange::Update {
                collection: Collection::attendance(kind),
                id: id.to_string(),
                body,
            }],
            format!("{} attendance entry updated successfully!", kind.label()),
        )
        .await;
        Ok(())
    }

    pub async fn delete_attendance(&mut self, kind: EntityKind, id: &str) -> Result<(), AppError> {
        let result = self.store.remove_attendance(kind, id);
        self.reject(result)?;

        self.commit(
            vec![RemoteChange::Delete {
                collection: Collection::attendance(kind),
                id: id.to_string(),
            }],
            "Attendance entry deleted successfully!".to_string(),
        )
        .await;
        Ok(())
    }

    pub fn export_summary(&self, kind: EntityKind, date: NaiveDate) -> Report {
        self.notifier.success(format!(
            "{} summary data exported successfully as XLS!",
            kind.label()
        ));
        Report::summary(&self.store, kind, date)
    }

    pub fn export_all(&self, today: NaiveDate) -> Report {
        self.notifier
            .success("Attendance data exported successfully as XLS!");
        Report::all_records(&self.store, today)
    }

    /// Replaces all attendance with the rows of the workbook's first sheet.
    pub async fn import_workbook(&mut self, bytes: &[u8]) -> Result<ImportOutcome, AppError> {
        let cells = match read_workbook(bytes) {
            Ok(cells) => cells,
            Err(e) => {
                error!("Failed to read imported workbook: {}", e);
                self.notifier
                    .error("Error importing XLS data. Please check the file format.");
                return Err(e);
            }
        };
        Ok(self.import_rows(&rows_from_cells(&cells)).await)
    }

    pub async fn import_rows(&mut self, rows: &[ImportRow]) -> ImportOutcome {
        let mut changes: Vec<RemoteChange> = Vec::new();
        for kind in EntityKind::ALL {
            let collection = Collection::attendance(kind);
            let ids: Vec<String> = match kind {
                EntityKind::Lab => self.store.lab_attendance().iter().map(|a| a.id.clone()).collect(),
                EntityKind::Class => self.store.class_attendance().iter().map(|a| a.id.clone()).collect(),
            };
            changes.extend(ids.into_iter().map(|id| RemoteChange::Delete { collection, id }));
        }

        let outcome = import_records(&mut self.store, rows);

        changes.extend(self.store.lab_attendance().iter().map(|a| RemoteChange::Create {
            collection: Collection::LabAttendance,
            body: to_body(a),
        }));
        changes.extend(self.store.class_attendance().iter().map(|a| RemoteChange::Create {
            collection: Collection::ClassAttendance,
            body: to_body(a),
        }));

        let message = if outcome.skipped > 0 {
            format!(
                "Attendance data imported successfully from XLS! ({} imported, {} skipped)",
                outcome.imported, outcome.skipped
            )
        } else {
            "Attendance data imported successfully from XLS!".to_string()
        };
        self.commit(changes, message).await;
        outcome
    }

    /// Waits for the most recent remote push (and, through chaining, every
    /// earlier one) to finish.
    pub async fn flush_remote(&mut self) {
        if let Some(handle) = self.last_sync.take() {
            if let Err(e) = handle.await {
                error!("Remote sync task failed: {}", e);
            }
        }
    }

    fn reject<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(AppError::Validation(msg)) = &result {
            self.notifier.error(msg.clone());
        }
        result
    }

    async fn commit(&mut self, changes: Vec<RemoteChange>, message: String) {
        if let Err(e) = self.persistence.save_local(&self.store.to_snapshot()).await {
            error!("Failed to save local copy: {}", e);
            self.notifier.error(format!("Failed to save data locally: {}", e));
        }

        let previous = self.last_sync.take();
        self.last_sync = Some(self.persistence.sync_remote(
            changes,
            self.notifier.clone(),
            previous,
        ));

        info!("{}", message);
        self.notifier.success(message);
    }
}

fn to_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
