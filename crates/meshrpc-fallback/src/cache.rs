//! Process-wide cache holding the single shared instance of each fallback type.

use std::any::TypeId;

use dashmap::DashMap;

use crate::binding::{FallbackInstance, FallbackType};
use crate::error::FallbackError;

/// One instance per fallback type, created on first use and never evicted.
///
/// Entries are keyed by type name together with the implementation type, so
/// a name re-registered over a different implementation, or two registries
/// sharing one cache, never hand a handler an instance it cannot downcast.
///
/// Construction happens outside any lock; the result is published with an
/// atomic insert-if-absent. When two callers race on a miss, both may
/// construct, but only the first insert wins and every caller observes that
/// instance. Share the cache through an `Arc` handle; [`clear`](Self::clear)
/// resets it between tests.
#[derive(Default)]
pub struct FallbackCache {
    instances: DashMap<(String, TypeId), FallbackInstance>,
}

impl FallbackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical instance of `fallback`, constructing it on first use.
    pub fn get_or_create(
        &self,
        fallback: &FallbackType,
    ) -> Result<FallbackInstance, FallbackError> {
        let key = (fallback.name().to_string(), fallback.type_id());
        if let Some(existing) = self.instances.get(&key) {
            return Ok(existing.value().clone());
        }

        let candidate = fallback
            .construct()
            .ok_or_else(|| FallbackError::NoConstructor {
                class: fallback.name().to_string(),
            })?;

        let winner = self
            .instances
            .entry(key)
            .or_insert(candidate)
            .value()
            .clone();
        tracing::debug!(class = %fallback.name(), "fallback instance cached");
        Ok(winner)
    }

    /// Whether an instance is cached under the type name `class`.
    pub fn contains(&self, class: &str) -> bool {
        self.instances.iter().any(|entry| entry.key().0 == class)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&self) {
        self.instances.clear();
    }
}

impl std::fmt::Debug for FallbackCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCache")
            .field("instances", &self.instances.len())
            .finish()
    }
}
