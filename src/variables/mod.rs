//! Named variables, `{{NAME}}` substitution and separator expansion.

mod models;
mod resolver;
mod store;

pub use models::{parse_separator_list, Variable};
pub use resolver::{
    Bindings, TaskPreview, TaskVariant, VariableSnapshot, MAX_RESOLVE_PASSES,
};
pub use store::VariableStore;
