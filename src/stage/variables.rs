//! Sprite-scoped user variables and user lists.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::formula::{Value, VariableLookup};

/// Named values and lists owned by one sprite, resolvable from formulas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableStore {
    variables: AHashMap<String, Value>,
    lists: AHashMap<String, Vec<Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_list(&mut self, name: impl Into<String>, items: Vec<Value>) {
        self.lists.insert(name.into(), items);
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.lists.get(name).map(|v| v.as_slice())
    }
}

impl VariableLookup for VariableStore {
    fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    fn list(&self, name: &str) -> Option<Vec<Value>> {
        self.lists.get(name).cloned()
    }
}
