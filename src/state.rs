use crate::store::{StoreSnapshot, TaskStore};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::{watch, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub store: Arc<Mutex<TaskStore>>,
    snapshots: watch::Receiver<Arc<StoreSnapshot>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, store: TaskStore) -> Self {
        let snapshots = store.subscribe();
        Self {
            data_path,
            store: Arc::new(Mutex::new(store)),
            snapshots,
        }
    }

    /// Latest published snapshot; never waits on a writer.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.snapshots.borrow().clone()
    }
}
