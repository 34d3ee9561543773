//! Task store.
//!
//! Holds the task collection fetched from the remote API and publishes an
//! immutable [`StoreSnapshot`] after every mutation. Derived data for a task
//! is rebuilt from its full item list whenever that task changes; snapshots
//! are never edited after publication.

use crate::charts::build_chart_data;
use crate::contributions::build_contribution_data;
use crate::errors::{ErrorKind, TaskError};
use crate::models::{Item, SortDirection, SortKey, Task, TaskView};
use crate::stats::build_stats;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

impl TaskView {
    pub fn build(task: Task) -> Self {
        Self {
            stats: build_stats(&task.items),
            chart_data: build_chart_data(&task.items),
            contribution_data: build_contribution_data(&task.items),
            task,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub version: u64,
    pub tasks: Vec<Arc<TaskView>>,
    pub active_task: Option<String>,
    pub error: Option<ErrorKind>,
}

impl StoreSnapshot {
    pub fn task(&self, uid: &str) -> Option<&Arc<TaskView>> {
        self.tasks.iter().find(|view| view.task.uid == uid)
    }

    pub fn active(&self) -> Option<&Arc<TaskView>> {
        self.active_task.as_deref().and_then(|uid| self.task(uid))
    }

    /// Items of a task ordered by `key`. Ties keep their stored order.
    pub fn sorted_items(
        &self,
        task_uid: &str,
        key: SortKey,
        direction: SortDirection,
    ) -> Result<Vec<Item>, TaskError> {
        let position = self.position(task_uid)?;
        let mut items = self.tasks[position].task.items.clone();
        items.sort_by(|a, b| {
            let ordering = compare_items(a, b, key);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(items)
    }

    fn position(&self, uid: &str) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|view| view.task.uid == uid)
            .ok_or_else(|| TaskError::TaskNotFound(uid.to_string()))
    }
}

pub struct TaskStore {
    sender: watch::Sender<Arc<StoreSnapshot>>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self { sender }
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.sender.borrow().clone()
    }

    /// Receiver that observes every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreSnapshot>> {
        self.sender.subscribe()
    }

    /// Replaces the whole collection with a fresh fetch result.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("replace_tasks", |next| {
            for (index, task) in tasks.iter().enumerate() {
                check_task(task)?;
                if tasks[..index].iter().any(|other| other.uid == task.uid) {
                    return Err(TaskError::DuplicateTask(task.uid.clone()));
                }
            }
            next.tasks = tasks
                .into_iter()
                .map(|task| Arc::new(TaskView::build(task)))
                .collect();
            if let Some(active) = next.active_task.as_deref() {
                if next.task(active).is_none() {
                    next.active_task = None;
                }
            }
            Ok(())
        })
    }

    pub fn create_task(&mut self, task: Task) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("create_task", |next| {
            if next.task(&task.uid).is_some() {
                return Err(TaskError::DuplicateTask(task.uid));
            }
            check_task(&task)?;
            next.tasks.push(Arc::new(TaskView::build(task)));
            Ok(())
        })
    }

    /// Swaps in the patched record returned for `task_uid`.
    pub fn patch_task(&mut self, task_uid: &str, task: Task) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("patch_task", |next| {
            check_uid(task_uid, &task.uid)?;
            let position = next.position(task_uid)?;
            check_task(&task)?;
            next.tasks[position] = Arc::new(TaskView::build(task));
            Ok(())
        })
    }

    pub fn delete_task(&mut self, task_uid: &str) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("delete_task", |next| {
            let position = next.position(task_uid)?;
            next.tasks.remove(position);
            if next.active_task.as_deref() == Some(task_uid) {
                next.active_task = None;
            }
            Ok(())
        })
    }

    pub fn create_item(&mut self, task_uid: &str, item: Item) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("create_item", |next| {
            update_task(next, task_uid, |task| {
                if task.item(&item.uid).is_some() {
                    return Err(TaskError::DuplicateItem {
                        task_uid: task.uid.clone(),
                        item_uid: item.uid,
                    });
                }
                task.check_item(&item)?;
                task.items.push(item);
                Ok(())
            })
        })
    }

    pub fn patch_item(
        &mut self,
        task_uid: &str,
        item_uid: &str,
        item: Item,
    ) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("patch_item", |next| {
            check_uid(item_uid, &item.uid)?;
            update_task(next, task_uid, |task| {
                task.check_item(&item)?;
                let slot = task
                    .items
                    .iter_mut()
                    .find(|existing| existing.uid == item_uid)
                    .ok_or_else(|| TaskError::ItemNotFound {
                        task_uid: task_uid.to_string(),
                        item_uid: item_uid.to_string(),
                    })?;
                *slot = item;
                Ok(())
            })
        })
    }

    pub fn delete_item(&mut self, task_uid: &str, item_uid: &str) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("delete_item", |next| {
            update_task(next, task_uid, |task| {
                let before = task.items.len();
                task.items.retain(|item| item.uid != item_uid);
                if task.items.len() == before {
                    return Err(TaskError::ItemNotFound {
                        task_uid: task_uid.to_string(),
                        item_uid: item_uid.to_string(),
                    });
                }
                Ok(())
            })
        })
    }

    pub fn set_active_task(&mut self, task_uid: Option<&str>) -> Result<Arc<StoreSnapshot>, TaskError> {
        self.apply("set_active_task", |next| {
            if let Some(uid) = task_uid {
                next.position(uid)?;
            }
            next.active_task = task_uid.map(str::to_string);
            Ok(())
        })
    }

    pub fn dismiss_error(&mut self) -> Arc<StoreSnapshot> {
        let mut next = (*self.snapshot()).clone();
        next.error = None;
        self.publish(next)
    }

    fn apply<F>(&mut self, op: &'static str, mutate: F) -> Result<Arc<StoreSnapshot>, TaskError>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<(), TaskError>,
    {
        let mut next = (*self.snapshot()).clone();
        match mutate(&mut next) {
            Ok(()) => {
                next.error = None;
                let published = self.publish(next);
                debug!(op, version = published.version, tasks = published.tasks.len(), "store updated");
                Ok(published)
            }
            Err(err) => Err(self.fail(op, err)),
        }
    }

    /// Records a rejected mutation as the store's current error.
    pub fn fail(&mut self, op: &'static str, err: TaskError) -> TaskError {
        warn!(op, error = %err, "store mutation rejected");
        let mut failed = (*self.snapshot()).clone();
        failed.error = Some(err.kind());
        self.publish(failed);
        err
    }

    fn publish(&self, mut next: StoreSnapshot) -> Arc<StoreSnapshot> {
        next.version = self.sender.borrow().version + 1;
        let next = Arc::new(next);
        self.sender.send_replace(Arc::clone(&next));
        next
    }
}

fn update_task<F>(snapshot: &mut StoreSnapshot, task_uid: &str, edit: F) -> Result<(), TaskError>
where
    F: FnOnce(&mut Task) -> Result<(), TaskError>,
{
    let position = snapshot.position(task_uid)?;
    let mut task = snapshot.tasks[position].task.clone();
    edit(&mut task)?;
    snapshot.tasks[position] = Arc::new(TaskView::build(task));
    Ok(())
}

fn check_task(task: &Task) -> Result<(), TaskError> {
    for (index, item) in task.items.iter().enumerate() {
        task.check_item(item)?;
        if task.items[..index].iter().any(|other| other.uid == item.uid) {
            return Err(TaskError::DuplicateItem {
                task_uid: task.uid.clone(),
                item_uid: item.uid.clone(),
            });
        }
    }
    Ok(())
}

fn check_uid(expected: &str, found: &str) -> Result<(), TaskError> {
    if expected != found {
        return Err(TaskError::UidMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

fn compare_items(a: &Item, b: &Item, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Start => a.period.start().cmp(&b.period.start()),
        SortKey::End => a.period.end().cmp(&b.period.end()),
        SortKey::Duration => a.duration_ms().cmp(&b.duration_ms()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricDefinition, Period};
    use crate::stats::tests::{at, item, metric};
    use crate::stats::COUNT_KEY;
    use chrono::Duration;

    fn task(uid: &str, metrics: Vec<MetricDefinition>, items: Vec<Item>) -> Task {
        Task {
            uid: uid.to_string(),
            name: format!("task {uid}"),
            created_at: at(2026, 1, 1, 0),
            image: None,
            metrics,
            items,
        }
    }

    fn count_total(view: &TaskView) -> f64 {
        view.stats
            .iter()
            .find(|stat| stat.metric_key == COUNT_KEY)
            .map(|stat| stat.total_value)
            .unwrap_or_default()
    }

    #[test]
    fn item_mutations_rebuild_derived_data() {
        let reps = metric("m-reps", "Reps", "x");
        let mut store = TaskStore::new();
        store
            .replace_tasks(vec![task("t1", vec![reps.clone()], Vec::new())])
            .unwrap();

        store
            .create_item("t1", item("a", at(2026, 3, 2, 8), 1, &[(&reps, 10.0)]))
            .unwrap();
        let snapshot = store
            .create_item("t1", item("b", at(2026, 3, 9, 8), 2, &[(&reps, 20.0)]))
            .unwrap();
        let view = snapshot.task("t1").unwrap();
        assert_eq!(count_total(view), 2.0);
        assert_eq!(view.stats[2].total_value, 30.0);
        assert_eq!(view.chart_data.weeks.len(), 2);
        assert_eq!(view.contribution_data.quarters.len(), 1);

        let snapshot = store
            .patch_item("t1", "b", item("b", at(2026, 3, 2, 9), 2, &[(&reps, 5.0)]))
            .unwrap();
        let view = snapshot.task("t1").unwrap();
        assert_eq!(view.stats[2].total_value, 15.0);
        assert_eq!(view.chart_data.weeks.len(), 1);

        let snapshot = store.delete_item("t1", "a").unwrap();
        let view = snapshot.task("t1").unwrap();
        assert_eq!(count_total(view), 1.0);
        assert_eq!(view.stats[2].max_value, 5.0);
    }

    #[test]
    fn snapshots_are_immutable_and_versioned() {
        let mut store = TaskStore::new();
        let mut updates = store.subscribe();

        let first = store.create_task(task("t1", Vec::new(), Vec::new())).unwrap();
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().version, first.version);

        let second = store
            .create_item("t1", item("a", at(2026, 3, 2, 8), 1, &[]))
            .unwrap();
        assert!(second.version > first.version);
        assert!(first.task("t1").unwrap().task.items.is_empty());
        assert_eq!(second.task("t1").unwrap().task.items.len(), 1);
        assert_eq!(updates.borrow().version, second.version);
    }

    #[test]
    fn untouched_tasks_are_shared_between_snapshots() {
        let mut store = TaskStore::new();
        let first = store
            .replace_tasks(vec![
                task("t1", Vec::new(), Vec::new()),
                task("t2", Vec::new(), Vec::new()),
            ])
            .unwrap();
        let second = store
            .create_item("t2", item("a", at(2026, 3, 2, 8), 1, &[]))
            .unwrap();
        assert!(Arc::ptr_eq(
            first.task("t1").unwrap(),
            second.task("t1").unwrap()
        ));
        assert!(!Arc::ptr_eq(
            first.task("t2").unwrap(),
            second.task("t2").unwrap()
        ));
    }

    #[test]
    fn failures_record_error_kind_until_dismissed() {
        let reps = metric("m-reps", "Reps", "x");
        let mut store = TaskStore::new();
        store.create_task(task("t1", Vec::new(), Vec::new())).unwrap();

        let err = store
            .create_item("t1", item("a", at(2026, 3, 2, 8), 1, &[(&reps, 1.0)]))
            .unwrap_err();
        assert!(matches!(err, TaskError::UnknownMetric { .. }));
        assert_eq!(store.snapshot().error, Some(ErrorKind::Unknown));
        assert!(store.snapshot().task("t1").unwrap().task.items.is_empty());

        let snapshot = store.dismiss_error();
        assert_eq!(snapshot.error, None);

        let err = store.delete_item("t1", "missing").unwrap_err();
        assert_eq!(
            err,
            TaskError::ItemNotFound {
                task_uid: "t1".into(),
                item_uid: "missing".into()
            }
        );

        // The next successful mutation clears the error as well.
        let snapshot = store.create_task(task("t2", Vec::new(), Vec::new())).unwrap();
        assert_eq!(snapshot.error, None);
    }

    #[test]
    fn invalid_period_is_reported_with_its_own_kind() {
        let start = at(2026, 3, 2, 8);
        let err = Period::new(start, start - Duration::minutes(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimePeriod);
    }

    #[test]
    fn uid_mismatch_and_duplicates_are_rejected() {
        let mut store = TaskStore::new();
        store.create_task(task("t1", Vec::new(), Vec::new())).unwrap();

        assert!(matches!(
            store.create_task(task("t1", Vec::new(), Vec::new())),
            Err(TaskError::DuplicateTask(_))
        ));
        assert!(matches!(
            store.patch_task("t1", task("t9", Vec::new(), Vec::new())),
            Err(TaskError::UidMismatch { .. })
        ));

        store
            .create_item("t1", item("a", at(2026, 3, 2, 8), 1, &[]))
            .unwrap();
        assert!(matches!(
            store.create_item("t1", item("a", at(2026, 3, 3, 8), 1, &[])),
            Err(TaskError::DuplicateItem { .. })
        ));
        assert!(matches!(
            store.patch_item("t1", "a", item("b", at(2026, 3, 3, 8), 1, &[])),
            Err(TaskError::UidMismatch { .. })
        ));
    }

    #[test]
    fn active_task_follows_deletes() {
        let mut store = TaskStore::new();
        store.create_task(task("t1", Vec::new(), Vec::new())).unwrap();
        store.create_task(task("t2", Vec::new(), Vec::new())).unwrap();

        let snapshot = store.set_active_task(Some("t2")).unwrap();
        assert_eq!(snapshot.active().unwrap().task.uid, "t2");
        assert!(store.set_active_task(Some("nope")).is_err());
        assert_eq!(store.snapshot().active_task.as_deref(), Some("t2"));

        let snapshot = store.delete_task("t2").unwrap();
        assert!(snapshot.active_task.is_none());
        assert_eq!(snapshot.tasks.len(), 1);
    }

    #[test]
    fn items_sort_by_key_and_direction() {
        let mut store = TaskStore::new();
        let mut items = vec![
            item("a", at(2026, 3, 3, 8), 3, &[]),
            item("b", at(2026, 3, 1, 8), 1, &[]),
            item("c", at(2026, 3, 2, 8), 2, &[]),
        ];
        items[0].name = "bike".into();
        items[1].name = "swim".into();
        items[2].name = "run".into();
        store.create_task(task("t1", Vec::new(), items)).unwrap();

        let uids = |items: Vec<Item>| items.into_iter().map(|i| i.uid).collect::<Vec<_>>();
        assert_eq!(
            uids(store.snapshot().sorted_items("t1", SortKey::Start, SortDirection::Asc).unwrap()),
            vec!["b", "c", "a"]
        );
        assert_eq!(
            uids(store.snapshot().sorted_items("t1", SortKey::Duration, SortDirection::Desc).unwrap()),
            vec!["a", "c", "b"]
        );
        assert_eq!(
            uids(store.snapshot().sorted_items("t1", SortKey::Name, SortDirection::Asc).unwrap()),
            vec!["a", "c", "b"]
        );
        assert!(store
            .snapshot()
            .sorted_items("missing", SortKey::Name, SortDirection::Asc)
            .is_err());
    }
}
