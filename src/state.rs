use std::sync::Arc;

use tokio::sync::Mutex;

use crate::persistence::LocalStore;
use crate::services::{Dashboard, Notifier};

#[derive(Clone)]
pub struct AppState {
    /// Commands take this lock for their whole duration, so they never interleave.
    pub dashboard: Arc<Mutex<Dashboard>>,
    pub notifier: Notifier,
    pub local: LocalStore,
}

impl AppState {
    pub fn new(dashboard: Dashboard, local: LocalStore) -> Self {
        let notifier = dashboard.notifier().clone();
        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
            notifier,
            local,
        }
    }
}
