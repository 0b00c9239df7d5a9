use super::models::Variable;
use crate::evaluator::SuccessCondition;
use crate::task::Task;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name to value overrides for a single variant.
pub type Bindings = BTreeMap<String, String>;

/// Upper bound on substitution passes. Chained references resolve within this
/// many hops; self-referential definitions stop here.
pub const MAX_RESOLVE_PASSES: usize = 10;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{([^{}]+)\}\}").expect("Failed to compile placeholder regex");
}

/// A fully substituted copy of a task's request template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskVariant {
    pub task_id: String,
    pub index: usize,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub headers_text: String,
    pub body: String,
    pub success_condition: SuccessCondition,
    pub delay_min: u64,
    pub delay_max: u64,
    pub bindings: Bindings,
}

/// What a task looks like after ordinary single-value substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPreview {
    pub id: String,
    pub name: String,
    pub url: String,
    pub method: String,
    pub data: String,
    pub headers_text: String,
    pub headers: BTreeMap<String, String>,
}

/// Immutable view of the variable store used for one resolution or run.
#[derive(Debug, Clone, Default)]
pub struct VariableSnapshot {
    vars: BTreeMap<String, Variable>,
}

impl VariableSnapshot {
    pub fn new(vars: BTreeMap<String, Variable>) -> Self {
        Self { vars }
    }

    /// Replaces `{{NAME}}` placeholders, preferring `overrides` over stored
    /// values. Unknown names are left verbatim.
    pub fn resolve(&self, text: &str, overrides: &Bindings) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_RESOLVE_PASSES {
            if !current.contains("{{") {
                break;
            }
            let next = PLACEHOLDER
                .replace_all(&current, |caps: &Captures| {
                    let name = &caps[1];
                    overrides
                        .get(name)
                        .or_else(|| self.vars.get(name).map(|v| &v.value))
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Positional binding sets, one per variant. Empty when no variable is
    /// multi-valued. Index `i` pairs the `i`-th token of every multi-valued
    /// variable; shorter lists simply stop contributing.
    pub fn binding_sets(&self) -> Vec<Bindings> {
        let mut sets: Vec<Bindings> = Vec::new();
        for (name, var) in &self.vars {
            let Some(values) = var.multi_values() else {
                continue;
            };
            for (i, value) in values.into_iter().enumerate() {
                if i >= sets.len() {
                    sets.push(Bindings::new());
                }
                sets[i].insert(name.clone(), value);
            }
        }
        sets
    }

    /// Expands a task into one variant per positional binding set, or a single
    /// plain variant when no variable is multi-valued.
    pub fn expand(&self, task: &Task) -> Vec<TaskVariant> {
        let mut sets = self.binding_sets();
        if sets.is_empty() {
            sets.push(Bindings::new());
        }
        sets.into_iter()
            .enumerate()
            .map(|(index, bindings)| self.variant(task, index, bindings))
            .collect()
    }

    /// Ordinary substitution only: multi-valued variables contribute their
    /// whole stored value. Used for one-off probe requests.
    pub fn single_variant(&self, task: &Task) -> TaskVariant {
        self.variant(task, 0, Bindings::new())
    }

    pub fn preview(&self, task: &Task) -> TaskPreview {
        let none = Bindings::new();
        TaskPreview {
            id: task.id.clone(),
            name: task.name.clone(),
            url: self.resolve(&task.url, &none),
            method: task.method.clone(),
            data: self.resolve(&task.body, &none),
            headers_text: self.resolve(&task.headers_text, &none),
            headers: self.resolve_headers(&task.headers, &none),
        }
    }

    fn variant(&self, task: &Task, index: usize, bindings: Bindings) -> TaskVariant {
        TaskVariant {
            task_id: task.id.clone(),
            index,
            url: self.resolve(&task.url, &bindings),
            method: task.method.clone(),
            headers: self.resolve_headers(&task.headers, &bindings),
            headers_text: self.resolve(&task.headers_text, &bindings),
            body: self.resolve(&task.body, &bindings),
            success_condition: task.success_condition.clone(),
            delay_min: task.delay_min,
            delay_max: task.delay_max,
            bindings,
        }
    }

    fn resolve_headers(
        &self,
        headers: &BTreeMap<String, String>,
        bindings: &Bindings,
    ) -> BTreeMap<String, String> {
        headers
            .iter()
            .map(|(k, v)| (self.resolve(k, bindings), self.resolve(v, bindings)))
            .collect()
    }
}
