//! Load-all / replace-all storage for tasks, variables, logs and schedules.

mod json_store;
mod memory;
mod writer;

pub use json_store::JsonFileStore;
pub use memory::InMemoryPersistence;
pub use writer::{PersistenceHandle, PersistenceWriter};

use crate::logs::LogSnapshot;
use crate::task::Task;
use crate::variables::Variable;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

/// Every operation replaces or returns the whole collection at once.
pub trait Persistence: Send + Sync {
    fn load_tasks(&self) -> Result<HashMap<String, Task>>;
    fn save_tasks(&self, tasks: &HashMap<String, Task>) -> Result<()>;

    fn load_variables(&self) -> Result<BTreeMap<String, Variable>>;
    fn save_variables(&self, vars: &BTreeMap<String, Variable>) -> Result<()>;

    fn load_logs(&self) -> Result<LogSnapshot>;
    fn save_logs(&self, logs: &LogSnapshot) -> Result<()>;

    /// Ids of the tasks registered with the scheduler.
    fn load_schedules(&self) -> Result<Vec<String>>;
    fn save_schedules(&self, task_ids: &[String]) -> Result<()>;
}
