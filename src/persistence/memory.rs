use super::Persistence;
use crate::logs::LogSnapshot;
use crate::task::Task;
use crate::variables::Variable;
use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct Stored {
    tasks: HashMap<String, Task>,
    variables: BTreeMap<String, Variable>,
    logs: LogSnapshot,
    schedules: Vec<String>,
}

/// Keeps everything in memory. Saves can be made to fail to exercise error
/// reporting.
#[derive(Default)]
pub struct InMemoryPersistence {
    stored: Mutex<Stored>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves of any collection.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn save_with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Stored),
    {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stored);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Stored) -> T,
    {
        let stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        f(&stored)
    }
}

impl Persistence for InMemoryPersistence {
    fn load_tasks(&self) -> Result<HashMap<String, Task>> {
        Ok(self.read(|s| s.tasks.clone()))
    }

    fn save_tasks(&self, tasks: &HashMap<String, Task>) -> Result<()> {
        self.save_with(|s| s.tasks = tasks.clone())
    }

    fn load_variables(&self) -> Result<BTreeMap<String, Variable>> {
        Ok(self.read(|s| s.variables.clone()))
    }

    fn save_variables(&self, vars: &BTreeMap<String, Variable>) -> Result<()> {
        self.save_with(|s| s.variables = vars.clone())
    }

    fn load_logs(&self) -> Result<LogSnapshot> {
        Ok(self.read(|s| s.logs.clone()))
    }

    fn save_logs(&self, logs: &LogSnapshot) -> Result<()> {
        self.save_with(|s| s.logs = logs.clone())
    }

    fn load_schedules(&self) -> Result<Vec<String>> {
        Ok(self.read(|s| s.schedules.clone()))
    }

    fn save_schedules(&self, task_ids: &[String]) -> Result<()> {
        self.save_with(|s| s.schedules = task_ids.to_vec())
    }
}
