use crate::value::Value;
use std::collections::HashMap;
use tracing::debug;

/// The one variable store of a program run. There are no nested scopes:
/// names bound inside loop or branch bodies stay visible afterwards.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    /// Reads `name`, falling back to integer 0 for unset names.
    pub fn lookup(&self, name: &str) -> Value {
        match self.values.get(name) {
            Some(value) => *value,
            None => {
                debug!(name, "unset variable read as 0");
                Value::default()
            }
        }
    }

    pub fn is_boolean(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(Value::is_boolean)
    }

    /// Binds `name`, replacing whatever kind of value it held before.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Bindings sorted by name.
    pub fn bindings(&self) -> Vec<(&str, Value)> {
        let mut bindings: Vec<_> = self
            .values
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        bindings
    }
}
