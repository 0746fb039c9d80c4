use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::models::EntityKind;
use crate::store::Snapshot;

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// Base URL the four collections hang off, e.g. `http://localhost:3000/api`.
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Labs,
    Classes,
    LabAttendance,
    ClassAttendance,
}

impl Collection {
    pub fn path(self) -> &'static str {
        match self {
            Collection::Labs => "labs",
            Collection::Classes => "classes",
            Collection::LabAttendance => "lab-attendance",
            Collection::ClassAttendance => "class-attendance",
        }
    }

    pub fn facilities(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Lab => Collection::Labs,
            EntityKind::Class => Collection::Classes,
        }
    }

    pub fn attendance(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Lab => Collection::LabAttendance,
            EntityKind::Class => Collection::ClassAttendance,
        }
    }
}

/// A single write to replay against the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    Create { collection: Collection, body: Value },
    Update { collection: Collection, id: String, body: Value },
    Delete { collection: Collection, id: String },
}

impl RemoteChange {
    pub fn describe(&self) -> String {
        match self {
            RemoteChange::Create { collection, .. } => format!("create {}", collection.path()),
            RemoteChange::Update { collection, id, .. } => {
                format!("update {}/{}", collection.path(), id)
            }
            RemoteChange::Delete { collection, id } => {
                format!("delete {}/{}", collection.path(), id)
            }
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, AppError>;
    async fn push(&self, change: &RemoteChange) -> Result<(), AppError>;
}

pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, collection: Collection, id: Option<&str>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match id {
            Some(id) => format!("{}/{}/{}", base, collection.path(), id),
            None => format!("{}/{}", base, collection.path()),
        }
    }

    async fn fetch_collection<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, AppError> {
        let response = self.client.get(self.url(collection, None)).send().await?;
        let response = check_status(response).await?;

        response.json::<Vec<T>>().await.map_err(|e| {
            AppError::Transport(format!(
                "Failed to parse {} response: {}",
                collection.path(),
                e
            ))
        })
    }
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Transport(format!("remote API error {}: {}", status, body)))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_snapshot(&self) -> Result<Snapshot, AppError> {
        let (labs, classes, lab_attendance, class_attendance) = tokio::try_join!(
            self.fetch_collection(Collection::Labs),
            self.fetch_collection(Collection::Classes),
            self.fetch_collection(Collection::LabAttendance),
            self.fetch_collection(Collection::ClassAttendance),
        )?;

        Ok(Snapshot {
            labs,
            classes,
            lab_attendance,
            class_attendance,
        })
    }

    async fn push(&self, change: &RemoteChange) -> Result<(), AppError> {
        let request = match change {
            RemoteChange::Create { collection, body } => {
                self.client.post(self.url(*collection, None)).json(body)
            }
            RemoteChange::Update { collection, id, body } => {
                self.client.put(self.url(*collection, Some(id))).json(body)
            }
            RemoteChange::Delete { collection, id } => {
                self.client.delete(self.url(*collection, Some(id)))
            }
        };

        let response = request.send().await?;
        let response = check_status(response).await?;
        debug!("remote {} -> {}", change.describe(), response.status());
        Ok(())
    }
}

/// Used when no remote store is configured. Fetching fails so that loading
/// falls through to the local copy; pushes are accepted and dropped.
pub struct NoopRemoteStore;

#[async_trait]
impl RemoteStore for NoopRemoteStore {
    async fn fetch_snapshot(&self) -> Result<Snapshot, AppError> {
        Err(AppError::Transport("no remote store configured".to_string()))
    }

    async fn push(&self, _change: &RemoteChange) -> Result<(), AppError> {
        Ok(())
    }
}
