use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use crate::error::AppError;
use crate::models::{ClassAttendance, ClassRoom, EntityKind, Lab, LabAttendance, Slot};
use crate::store::Snapshot;

/// Durable fallback copy of the store, kept in SQLite.
#[derive(Clone)]
pub struct LocalStore {
    db: SqlitePool,
}

#[derive(Debug, FromRow)]
struct AttendanceRow {
    id: String,
    date: NaiveDate,
    entity_id: String,
    slot: String,
    count: u32,
}

impl LocalStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database. Pinned to one connection so every query
    /// sees the same data.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }

    pub async fn load_snapshot(&self) -> Result<Snapshot, AppError> {
        let labs = sqlx::query_as::<_, Lab>("SELECT id, name, capacity FROM labs ORDER BY position")
            .fetch_all(&self.db)
            .await?;

        let classes =
            sqlx::query_as::<_, ClassRoom>("SELECT id, name, capacity FROM classes ORDER BY position")
                .fetch_all(&self.db)
                .await?;

        let lab_attendance = sqlx::query_as::<_, AttendanceRow>(
            "SELECT id, date, lab_id AS entity_id, slot, count FROM lab_attendance ORDER BY position",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .filter_map(|row| {
            let slot = parse_stored_slot(&row, EntityKind::Lab)?;
            Some(LabAttendance {
                id: row.id,
                date: row.date,
                lab_id: row.entity_id,
                slot,
                count: row.count,
            })
        })
        .collect();

        let class_attendance = sqlx::query_as::<_, AttendanceRow>(
            "SELECT id, date, class_id AS entity_id, slot, count FROM class_attendance ORDER BY position",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .filter_map(|row| {
            let slot = parse_stored_slot(&row, EntityKind::Class)?;
            Some(ClassAttendance {
                id: row.id,
                date: row.date,
                class_id: row.entity_id,
                slot,
                count: row.count,
            })
        })
        .collect();

        Ok(Snapshot {
            labs,
            classes,
            lab_attendance,
            class_attendance,
        })
    }

    /// Replaces every table with the snapshot's contents in one transaction.
    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        for table in ["lab_attendance", "class_attendance", "labs", "classes"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        for (position, lab) in snapshot.labs.iter().enumerate() {
            sqlx::query("INSERT INTO labs (position, id, name, capacity) VALUES (?, ?, ?, ?)")
                .bind(position as i64)
                .bind(&lab.id)
                .bind(&lab.name)
                .bind(lab.capacity)
                .execute(&mut *tx)
                .await?;
        }

        for (position, class) in snapshot.classes.iter().enumerate() {
            sqlx::query("INSERT INTO classes (position, id, name, capacity) VALUES (?, ?, ?, ?)")
                .bind(position as i64)
                .bind(&class.id)
                .bind(&class.name)
                .bind(class.capacity)
                .execute(&mut *tx)
                .await?;
        }

        for (position, entry) in snapshot.lab_attendance.iter().enumerate() {
            sqlx::query(
                "INSERT INTO lab_attendance (position, id, date, lab_id, slot, count) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&entry.id)
            .bind(entry.date)
            .bind(&entry.lab_id)
            .bind(entry.slot.as_str())
            .bind(entry.count)
            .execute(&mut *tx)
            .await?;
        }

        for (position, entry) in snapshot.class_attendance.iter().enumerate() {
            sqlx::query(
                "INSERT INTO class_attendance (position, id, date, class_id, slot, count) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&entry.id)
            .bind(entry.date)
            .bind(&entry.class_id)
            .bind(entry.slot.as_str())
            .bind(entry.count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn parse_stored_slot(row: &AttendanceRow, kind: EntityKind) -> Option<Slot> {
    let slot = Slot::parse(&row.slot).filter(|s| s.kind() == kind);
    if slot.is_none() {
        warn!(
            "Dropping stored {} attendance {} with invalid slot {:?}",
            kind.label().to_lowercase(),
            row.id,
            row.slot
        );
    }
    slot
}
