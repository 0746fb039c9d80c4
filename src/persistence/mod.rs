pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::{Collection, HttpRemoteStore, NoopRemoteStore, RemoteChange, RemoteConfig, RemoteStore};

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::AppError;
use crate::services::Notifier;
use crate::store::Snapshot;

/// Where the startup snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Remote,
    Local,
}

/// Keeps the local copy authoritative and mirrors changes to the remote
/// store on a best-effort basis.
#[derive(Clone)]
pub struct PersistenceAdapter {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
}

impl PersistenceAdapter {
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteStore>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Remote first; any remote failure falls back to the local copy.
    pub async fn load(&self) -> Result<(Snapshot, LoadSource), AppError> {
        match self.remote.fetch_snapshot().await {
            Ok(snapshot) => {
                info!(
                    "Loaded {} labs, {} classes from remote store",
                    snapshot.labs.len(),
                    snapshot.classes.len()
                );
                Ok((snapshot, LoadSource::Remote))
            }
            Err(e) => {
                warn!("Error loading data from remote store, falling back to local copy: {}", e);
                let snapshot = self.local.load_snapshot().await?;
                Ok((snapshot, LoadSource::Local))
            }
        }
    }

    pub async fn save_local(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        self.local.save_snapshot(snapshot).await
    }

    /// Pushes `changes` in order on a background task, after `previous` has
    /// finished. Failures are logged and reported through `notifier`;
    /// nothing is rolled back.
    pub fn sync_remote(
        &self,
        changes: Vec<RemoteChange>,
        notifier: Notifier,
        previous: Option<JoinHandle<()>>,
    ) -> JoinHandle<()> {
        let remote = self.remote.clone();
        tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let mut failed = 0usize;
            for change in &changes {
                if let Err(e) = remote.push(change).await {
                    warn!("Remote sync failed for {}: {}", change.describe(), e);
                    failed += 1;
                }
            }
            if failed > 0 {
                notifier.error(format!(
                    "Remote sync failed for {} of {} change(s); data saved locally",
                    failed,
                    changes.len()
                ));
            }
        })
    }
}
