//! Named fallback beans resolved by an external lookup.

use std::sync::Arc;

use crate::binding::{FallbackInstance, FallbackType};

/// A fallback implementation obtained by bean name rather than by type.
#[derive(Clone)]
pub struct FallbackBean {
    pub fallback: Arc<FallbackType>,
    pub instance: FallbackInstance,
}

impl FallbackBean {
    pub fn new<T: Send + Sync + 'static>(fallback: Arc<FallbackType>, instance: T) -> Self {
        Self {
            fallback,
            instance: Arc::new(instance),
        }
    }
}

impl std::fmt::Debug for FallbackBean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackBean")
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Looks up fallback beans by name, e.g. in a dependency-injection container.
pub trait FallbackBeanResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<FallbackBean>;
}

impl<F> FallbackBeanResolver for F
where
    F: Fn(&str) -> Option<FallbackBean> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<FallbackBean> {
        self(name)
    }
}
