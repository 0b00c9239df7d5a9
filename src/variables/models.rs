use serde::{Deserialize, Serialize};

/// A named value. When `separators` is non-empty the value may split into
/// several positional values, one per request variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredVariable")]
pub struct Variable {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub separators: Vec<String>,
}

impl Variable {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            separators: Vec::new(),
        }
    }

    pub fn with_separators(value: impl Into<String>, separators: Vec<String>) -> Self {
        Self {
            value: value.into(),
            separators,
        }
    }

    /// Splits the value by every separator in turn, trimming and dropping
    /// empty tokens.
    pub fn tokens(&self) -> Vec<String> {
        let mut pieces = vec![self.value.clone()];
        for sep in self.separators.iter().filter(|s| !s.is_empty()) {
            pieces = pieces
                .iter()
                .flat_map(|piece| piece.split(sep.as_str()))
                .map(str::to_string)
                .collect();
        }
        pieces
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// The split values, or `None` when this variable expands to a single value.
    pub fn multi_values(&self) -> Option<Vec<String>> {
        if self.separators.iter().all(|s| s.is_empty()) {
            return None;
        }
        let tokens = self.tokens();
        if tokens.len() > 1 {
            Some(tokens)
        } else {
            None
        }
    }
}

/// Every shape a variable has been stored in: a bare string, an object with a
/// separator list, or an object with one comma-delimited separator string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredVariable {
    Plain(String),
    Structured {
        #[serde(default)]
        value: String,
        #[serde(default)]
        separators: Option<Vec<String>>,
        #[serde(default)]
        separator: Option<String>,
    },
}

impl From<StoredVariable> for Variable {
    fn from(stored: StoredVariable) -> Self {
        match stored {
            StoredVariable::Plain(value) => Variable::plain(value),
            StoredVariable::Structured {
                value,
                separators: Some(separators),
                ..
            } => Variable::with_separators(value, separators),
            StoredVariable::Structured {
                value, separator, ..
            } => Variable::with_separators(value, parse_separator_list(separator.as_deref())),
        }
    }
}

/// Parses the comma-delimited separator form. A separator string made only of
/// commas means the comma itself.
pub fn parse_separator_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let list: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if list.is_empty() && raw.contains(',') {
        vec![",".to_string()]
    } else {
        list
    }
}
