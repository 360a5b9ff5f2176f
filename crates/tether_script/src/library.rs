//! Native Function Library Base.

use crate::{NativeFunction, Table};
use std::collections::BTreeMap;

/// A namespace of native functions, e.g. `Component.get`.
///
/// Built once, then registered with any number of runtimes through
/// [`ScriptRuntime::register_library`](crate::ScriptRuntime::register_library).
#[derive(Debug, Clone)]
pub struct Library {
    name: String,
    functions: BTreeMap<String, NativeFunction>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    /// Add `function` under `name`, replacing any previous one.
    pub fn with_function(mut self, name: impl Into<String>, function: NativeFunction) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Functions ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &NativeFunction)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn function(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The namespace as a value, one function entry per name.
    pub fn to_table(&self) -> Table {
        self.functions
            .iter()
            .map(|(name, f)| (name.clone(), f.clone()))
            .collect()
    }
}
