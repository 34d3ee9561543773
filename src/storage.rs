use crate::errors::AppError;
use crate::models::Task;
use crate::store::StoreSnapshot;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

/// Reads the task list last written by [`persist_tasks`]. Missing or broken
/// files hydrate an empty store.
pub async fn load_tasks(path: &Path) -> Vec<Task> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Vec<Task>>(&bytes) {
            Ok(tasks) => {
                info!(path = %path.display(), tasks = tasks.len(), "hydrated task list");
                tasks
            }
            Err(err) => {
                error!("failed to parse task file: {err}");
                Vec::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            error!("failed to read task file: {err}");
            Vec::new()
        }
    }
}

pub async fn persist_tasks(path: &Path, snapshot: &StoreSnapshot) -> Result<(), AppError> {
    let tasks: Vec<&Task> = snapshot.tasks.iter().map(|view| &view.task).collect();
    let payload = serde_json::to_vec_pretty(&tasks).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("habit_tracker_{name}_{}_{nanos}.json", std::process::id()));
        path
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let tasks = load_tasks(&scratch_path("missing")).await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_loads_empty() {
        let path = scratch_path("malformed");
        fs::write(&path, b"{ not json").await.unwrap();
        assert!(load_tasks(&path).await.is_empty());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn persisted_tasks_hydrate_again() {
        let path = scratch_path("persist");
        let raw = serde_json::json!([{
            "uid": "t1",
            "name": "Running",
            "createdAt": "2026-01-01T00:00:00Z",
            "image": { "uid": "img", "file": "run.png" },
            "metrics": [{ "uid": "m-km", "name": "Distance", "unit": "km", "createdAt": "2026-01-01T00:00:00Z" }],
            "items": [{
                "uid": "i1",
                "name": "morning",
                "desc": null,
                "period": ["2026-01-02T07:00:00Z", "2026-01-02T07:45:00Z"],
                "createdAt": "2026-01-02T08:00:00Z",
                "metricQuantities": [{
                    "uid": "q1",
                    "quantity": "5.2",
                    "metric": { "uid": "m-km", "name": "Distance", "unit": "km", "createdAt": "2026-01-01T00:00:00Z" },
                    "createdAt": "2026-01-02T08:00:00Z"
                }]
            }]
        }]);
        let tasks: Vec<Task> = serde_json::from_value(raw).unwrap();

        let mut store = TaskStore::new();
        let snapshot = store.replace_tasks(tasks.clone()).unwrap();
        persist_tasks(&path, &snapshot).await.unwrap();

        let loaded = load_tasks(&path).await;
        assert_eq!(loaded, tasks);
        assert_eq!(loaded[0].items[0].metric_quantities[0].quantity, 5.2);
        let _ = fs::remove_file(&path).await;
    }
}
