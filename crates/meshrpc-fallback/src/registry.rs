//! Registration table of fallback types, keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::FallbackType;

/// Fallback types known to an executor.
///
/// Built once at startup; calls refer to entries through
/// [`FallbackClass::Named`](meshrpc_core::FallbackClass::Named).
#[derive(Debug, Default)]
pub struct FallbackRegistry {
    types: HashMap<String, Arc<FallbackType>>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, returning the one it replaced under the same name.
    pub fn register(&mut self, fallback: FallbackType) -> Option<Arc<FallbackType>> {
        let name = fallback.name().to_string();
        let previous = self.types.insert(name.clone(), Arc::new(fallback));
        if previous.is_some() {
            tracing::warn!(class = %name, "fallback type re-registered");
        }
        previous
    }

    pub fn with(mut self, fallback: FallbackType) -> Self {
        self.register(fallback);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<FallbackType>> {
        self.types.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
