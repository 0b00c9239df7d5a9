use super::models::{RunStatus, Task, TaskPage};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// In-memory owner of every task. All mutation goes through its write lock;
/// callers only ever receive clones.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole store. Running flags left over from a previous
    /// process are cleared since no run can survive a restart.
    pub fn load(&self, tasks: HashMap<String, Task>) {
        let mut guard = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        *guard = tasks;
        for task in guard.values_mut() {
            task.is_running = false;
            if task.last_run_status == Some(RunStatus::Running) {
                task.last_run_status = None;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(id)
    }

    pub fn len(&self) -> usize {
        let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, task: Task) {
        let mut guard = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(task.id.clone(), task);
    }

    /// Applies `f` to the task under the write lock and returns the result.
    pub fn update<F>(&self, id: &str, f: F) -> Option<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut guard = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let task = guard.get_mut(id)?;
        f(task);
        Some(task.clone())
    }

    pub fn remove(&self, id: &str) -> Option<Task> {
        let mut guard = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(id)
    }

    pub fn snapshot(&self) -> HashMap<String, Task> {
        let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Returns false when the task does not exist.
    pub fn set_running(&self, id: &str, running: bool) -> bool {
        self.update(id, |task| task.is_running = running).is_some()
    }

    pub fn is_running(&self, id: &str) -> bool {
        let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(id).map(|t| t.is_running).unwrap_or(false)
    }

    pub fn record_last_run(
        &self,
        id: &str,
        time: String,
        status: RunStatus,
        result: String,
    ) -> Option<Task> {
        self.update(id, |task| {
            task.last_run_time = Some(time);
            task.last_run_status = Some(status);
            task.last_run_result = Some(result);
        })
    }

    /// `page` is 1-based; a zero page or page size is treated as 1.
    pub fn page(&self, page: usize, page_size: usize) -> TaskPage {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let mut tasks: Vec<Task> = {
            let guard = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
            guard.values().cloned().collect()
        };
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = tasks.len();
        let tasks = tasks
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        TaskPage {
            tasks,
            total,
            page,
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;

    fn task(name: &str, created_at: i64) -> Task {
        TaskDraft {
            name: name.to_string(),
            url: "http://localhost".to_string(),
            times: 1,
            threads: 1,
            ..Default::default()
        }
        .into_task(created_at)
    }

    #[test]
    fn insert_get_update_remove() {
        let store = TaskStore::new();
        let t = task("a", 1);
        let id = t.id.clone();
        store.insert(t);

        assert!(store.contains(&id));
        let updated = store.update(&id, |t| t.times = 9).unwrap();
        assert_eq!(updated.times, 9);
        assert_eq!(store.get(&id).unwrap().times, 9);

        assert!(store.update("missing", |_| {}).is_none());
        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn load_clears_stale_running_state() {
        let mut t = task("a", 1);
        t.is_running = true;
        t.last_run_status = Some(RunStatus::Running);
        let id = t.id.clone();

        let store = TaskStore::new();
        store.load(HashMap::from([(id.clone(), t)]));

        let loaded = store.get(&id).unwrap();
        assert!(!loaded.is_running);
        assert_eq!(loaded.last_run_status, None);
    }

    #[test]
    fn pages_newest_first() {
        let store = TaskStore::new();
        for i in 0..5 {
            store.insert(task(&format!("t{i}"), i));
        }

        let first = store.page(1, 2);
        assert_eq!(first.total, 5);
        let names: Vec<_> = first.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t4", "t3"]);

        let last = store.page(3, 2);
        assert_eq!(last.tasks.len(), 1);
        assert_eq!(last.tasks[0].name, "t0");

        assert!(store.page(10, 2).tasks.is_empty());
        assert_eq!(store.page(0, 0).page, 1);
    }

    #[test]
    fn record_last_run_sets_all_fields() {
        let store = TaskStore::new();
        let t = task("a", 1);
        let id = t.id.clone();
        store.insert(t);

        store.record_last_run(
            &id,
            "2024-01-01 00:00:00".to_string(),
            RunStatus::Partial,
            "1/2".to_string(),
        );
        let t = store.get(&id).unwrap();
        assert_eq!(t.last_run_status, Some(RunStatus::Partial));
        assert_eq!(t.last_run_result.as_deref(), Some("1/2"));
    }
}
