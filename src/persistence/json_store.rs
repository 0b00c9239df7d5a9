use super::Persistence;
use crate::logs::{ExecutionLog, LogSnapshot, TaskLogEntry};
use crate::task::Task;
use crate::variables::Variable;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const TASKS_FILE: &str = "tasks.json";
const VARIABLES_FILE: &str = "env_variables.json";
const TASK_LOGS_FILE: &str = "task_logs.json";
const EXECUTION_LOGS_FILE: &str = "execution_logs.json";
const SCHEDULES_FILE: &str = "scheduled_tasks.json";

/// One pretty-printed JSON file per collection inside a data directory.
/// Writes go to a temporary file in the same directory that is then renamed
/// over the target.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            debug!("{:?} does not exist yet, starting empty", path);
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", self.dir))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)
                .with_context(|| format!("Failed to serialize {}", name))?;
            writer
                .flush()
                .with_context(|| format!("Failed to write {}", name))?;
        }
        tmp.persist(&path)
            .with_context(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }
}

impl Persistence for JsonFileStore {
    fn load_tasks(&self) -> Result<HashMap<String, Task>> {
        self.read(TASKS_FILE)
    }

    fn save_tasks(&self, tasks: &HashMap<String, Task>) -> Result<()> {
        self.write(TASKS_FILE, tasks)
    }

    fn load_variables(&self) -> Result<BTreeMap<String, Variable>> {
        self.read(VARIABLES_FILE)
    }

    fn save_variables(&self, vars: &BTreeMap<String, Variable>) -> Result<()> {
        self.write(VARIABLES_FILE, vars)
    }

    fn load_logs(&self) -> Result<LogSnapshot> {
        let task_logs: HashMap<String, Vec<TaskLogEntry>> = self.read(TASK_LOGS_FILE)?;
        let execution_logs: HashMap<String, ExecutionLog> = self.read(EXECUTION_LOGS_FILE)?;
        Ok(LogSnapshot {
            task_logs,
            execution_logs,
        })
    }

    fn save_logs(&self, logs: &LogSnapshot) -> Result<()> {
        self.write(TASK_LOGS_FILE, &logs.task_logs)?;
        self.write(EXECUTION_LOGS_FILE, &logs.execution_logs)
    }

    fn load_schedules(&self) -> Result<Vec<String>> {
        self.read(SCHEDULES_FILE)
    }

    fn save_schedules(&self, task_ids: &[String]) -> Result<()> {
        self.write(SCHEDULES_FILE, task_ids)
    }
}
