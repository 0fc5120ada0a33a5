//! Browser environment implementation using an in-memory key-value store.

use std::collections::HashMap;

use crate::env::Environment;

/// Fixed environment variables for browser builds and tests.
///
/// Extension bundles bake their flags in at build time, so the set is
/// immutable once constructed.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvironment {
    vars: HashMap<String, String>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a variable.
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_owned(), value.to_owned());
        self
    }
}

impl Environment for MemoryEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
