use crate::errors::{AppError, ErrorKind, TaskError};
use crate::models::{
    decode_record, ActiveTaskRequest, ChartData, ContributionData, Item, ItemView, ItemsQuery,
    Stat, Task, TaskView,
};
use crate::state::AppState;
use crate::storage::persist_tasks;
use crate::store::{StoreSnapshot, TaskStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStatus {
    pub error: Option<ErrorKind>,
    pub message: Option<&'static str>,
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Arc<TaskView>>> {
    Json(state.snapshot().tasks.clone())
}

pub async fn replace_tasks(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Json<Vec<Arc<TaskView>>>, AppError> {
    let snapshot = mutate(&state, "replace_tasks", |store| {
        let tasks: Vec<Task> = decode(store, "replace_tasks", raw)?;
        store.replace_tasks(tasks)
    })
    .await?;
    info!(tasks = snapshot.tasks.len(), "task list replaced");
    Ok(Json(snapshot.tasks.clone()))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<(StatusCode, Json<Arc<TaskView>>), AppError> {
    let mut uid = String::new();
    let snapshot = mutate(&state, "create_task", |store| {
        let task: Task = decode(store, "create_task", raw)?;
        uid = task.uid.clone();
        store.create_task(task)
    })
    .await?;
    info!(task = %uid, "task created");
    Ok((StatusCode::CREATED, Json(find_task(&snapshot, &uid)?)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
) -> Result<Json<Arc<TaskView>>, AppError> {
    Ok(Json(find_task(&state.snapshot(), &task_uid)?))
}

pub async fn patch_task(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
    Json(raw): Json<Value>,
) -> Result<Json<Arc<TaskView>>, AppError> {
    let snapshot = mutate(&state, "patch_task", |store| {
        let task: Task = decode(store, "patch_task", raw)?;
        store.patch_task(&task_uid, task)
    })
    .await?;
    Ok(Json(find_task(&snapshot, &task_uid)?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
) -> Result<StatusCode, AppError> {
    mutate(&state, "delete_task", |store| store.delete_task(&task_uid)).await?;
    info!(task = %task_uid, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stats(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
) -> Result<Json<Vec<Stat>>, AppError> {
    let view = find_task(&state.snapshot(), &task_uid)?;
    Ok(Json(view.stats.clone()))
}

pub async fn get_charts(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
) -> Result<Json<ChartData>, AppError> {
    let view = find_task(&state.snapshot(), &task_uid)?;
    Ok(Json(view.chart_data.clone()))
}

pub async fn get_contributions(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
) -> Result<Json<ContributionData>, AppError> {
    let view = find_task(&state.snapshot(), &task_uid)?;
    Ok(Json(view.contribution_data.clone()))
}

pub async fn list_items(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<ItemView>>, AppError> {
    let items = state.snapshot().sorted_items(&task_uid, query.sort, query.direction)?;
    Ok(Json(items.into_iter().map(ItemView::from).collect()))
}

pub async fn create_item(
    State(state): State<AppState>,
    Path(task_uid): Path<String>,
    Json(raw): Json<Value>,
) -> Result<(StatusCode, Json<Arc<TaskView>>), AppError> {
    let mut item_uid = String::new();
    let snapshot = mutate(&state, "create_item", |store| {
        let item: Item = decode(store, "create_item", raw)?;
        item_uid = item.uid.clone();
        store.create_item(&task_uid, item)
    })
    .await?;
    info!(task = %task_uid, item = %item_uid, "item created");
    Ok((StatusCode::CREATED, Json(find_task(&snapshot, &task_uid)?)))
}

pub async fn patch_item(
    State(state): State<AppState>,
    Path((task_uid, item_uid)): Path<(String, String)>,
    Json(raw): Json<Value>,
) -> Result<Json<Arc<TaskView>>, AppError> {
    let snapshot = mutate(&state, "patch_item", |store| {
        let item: Item = decode(store, "patch_item", raw)?;
        store.patch_item(&task_uid, &item_uid, item)
    })
    .await?;
    Ok(Json(find_task(&snapshot, &task_uid)?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path((task_uid, item_uid)): Path<(String, String)>,
) -> Result<Json<Arc<TaskView>>, AppError> {
    let snapshot = mutate(&state, "delete_item", |store| store.delete_item(&task_uid, &item_uid)).await?;
    info!(task = %task_uid, item = %item_uid, "item deleted");
    Ok(Json(find_task(&snapshot, &task_uid)?))
}

pub async fn set_active_task(
    State(state): State<AppState>,
    Json(payload): Json<ActiveTaskRequest>,
) -> Result<Json<Option<Arc<TaskView>>>, AppError> {
    let mut store = state.store.lock().await;
    let snapshot = store.set_active_task(payload.task_uid.as_deref())?;
    Ok(Json(snapshot.active().cloned()))
}

pub async fn get_error(State(state): State<AppState>) -> Json<ErrorStatus> {
    Json(error_status(state.snapshot().error))
}

pub async fn dismiss_error(State(state): State<AppState>) -> Json<ErrorStatus> {
    let mut store = state.store.lock().await;
    Json(error_status(store.dismiss_error().error))
}

/// Runs one store mutation and writes the resulting task list to disk. A
/// failed write is recorded on the store, since memory is then ahead of disk.
async fn mutate<F>(state: &AppState, op: &'static str, run: F) -> Result<Arc<StoreSnapshot>, AppError>
where
    F: FnOnce(&mut TaskStore) -> Result<Arc<StoreSnapshot>, TaskError>,
{
    let mut store = state.store.lock().await;
    let snapshot = run(&mut *store)?;
    if let Err(err) = persist_tasks(&state.data_path, &snapshot).await {
        return Err(store.fail(op, TaskError::Storage(err.message)).into());
    }
    Ok(snapshot)
}

fn decode<T: DeserializeOwned>(
    store: &mut TaskStore,
    op: &'static str,
    raw: Value,
) -> Result<T, TaskError> {
    decode_record(raw).map_err(|err| store.fail(op, err))
}

fn find_task(snapshot: &StoreSnapshot, task_uid: &str) -> Result<Arc<TaskView>, AppError> {
    snapshot
        .task(task_uid)
        .cloned()
        .ok_or_else(|| TaskError::TaskNotFound(task_uid.to_string()).into())
}

fn error_status(error: Option<ErrorKind>) -> ErrorStatus {
    ErrorStatus {
        error,
        message: error.map(ErrorKind::user_message),
    }
}
