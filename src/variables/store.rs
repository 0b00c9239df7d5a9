use super::models::Variable;
use super::resolver::VariableSnapshot;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Global named variables. Runs work on a [`VariableSnapshot`] taken before
/// dispatch, so edits never reach a run that is already in flight.
#[derive(Default)]
pub struct VariableStore {
    vars: RwLock<BTreeMap<String, Variable>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, vars: BTreeMap<String, Variable>) {
        let mut guard = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        *guard = vars;
    }

    pub fn get(&self, name: &str) -> Option<Variable> {
        let guard = self.vars.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(name).cloned()
    }

    /// Inserts or replaces. Returns the previous definition.
    pub fn set(&self, name: &str, var: Variable) -> Option<Variable> {
        let mut guard = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(name.to_string(), var)
    }

    pub fn remove(&self, name: &str) -> Option<Variable> {
        let mut guard = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(name)
    }

    pub fn all(&self) -> BTreeMap<String, Variable> {
        let guard = self.vars.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    pub fn snapshot(&self) -> VariableSnapshot {
        VariableSnapshot::new(self.all())
    }
}
