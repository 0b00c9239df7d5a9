use super::{Engine, EngineError};
use crate::logs::{ExecutionLog, TaskLogEntry};
use crate::variables::Variable;
use std::collections::BTreeMap;
use tracing::info;

impl Engine {
    // ========================================================================
    // Variables
    // ========================================================================

    pub fn list_variables(&self) -> BTreeMap<String, Variable> {
        self.variables.all()
    }

    pub fn get_variable(&self, name: &str) -> Result<Variable, EngineError> {
        self.variables
            .get(name)
            .ok_or_else(|| EngineError::VariableNotFound(name.to_string()))
    }

    pub fn set_variable(&self, name: &str, variable: Variable) -> Result<Variable, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Invalid(
                "variable name must not be empty".to_string(),
            ));
        }
        if name.contains("{{") || name.contains("}}") {
            return Err(EngineError::Invalid(format!(
                "variable name '{}' must not contain braces",
                name
            )));
        }
        let previous = self.variables.set(name, variable.clone());
        info!(
            "{} variable {}",
            if previous.is_some() { "Updated" } else { "Created" },
            name
        );
        self.save_variables_now()?;
        Ok(variable)
    }

    /// Accepts either a JSON string (plain value) or an object with `value`
    /// and `separators` or the legacy `separator` field.
    pub fn set_variable_json(&self, name: &str, payload: &str) -> Result<Variable, EngineError> {
        let variable: Variable = serde_json::from_str(payload).map_err(|e| {
            EngineError::Invalid(format!("malformed variable payload: {}", e))
        })?;
        self.set_variable(name, variable)
    }

    pub fn delete_variable(&self, name: &str) -> Result<(), EngineError> {
        self.variables
            .remove(name)
            .ok_or_else(|| EngineError::VariableNotFound(name.to_string()))?;
        info!("Deleted variable {}", name);
        self.save_variables_now()
    }

    // ========================================================================
    // Logs
    // ========================================================================

    pub fn task_logs(&self, task_id: &str) -> Result<Vec<TaskLogEntry>, EngineError> {
        self.get_task(task_id)?;
        Ok(self.logs.task_logs(task_id))
    }

    pub fn execution_log(&self, log_id: &str) -> Result<ExecutionLog, EngineError> {
        self.logs
            .execution_log(log_id)
            .ok_or_else(|| EngineError::LogNotFound(log_id.to_string()))
    }

    pub fn clear_task_logs(&self, task_id: &str) -> Result<(), EngineError> {
        self.get_task(task_id)?;
        if self.logs.clear_task(task_id) {
            self.save_logs_now()?;
        }
        Ok(())
    }

    pub fn clear_all_logs(&self) -> Result<(), EngineError> {
        self.logs.clear_all();
        info!("Cleared all logs");
        self.save_logs_now()
    }
}
