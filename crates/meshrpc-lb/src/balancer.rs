//! Instance selection: readiness filtering, exclusion handling and the
//! single-instance shortcut, with the final pick delegated to a
//! [`RankingStrategy`].

use std::sync::Arc;

use meshrpc_core::{ExclusionSet, ServiceCall, ServiceInstance, ServiceRegistry};

use crate::strategy::RankingStrategy;

/// Select an instance of `call`'s service from `registry`.
///
/// Returns `None` when nothing can be selected: empty service name, no
/// candidates, no ready candidates, or a single ready candidate that is
/// already excluded. When exclusions would remove every ready instance of a
/// multi-instance pool, ranking runs over the full ready pool instead, since
/// earlier failures are assumed transient.
pub fn choose(
    registry: &dyn ServiceRegistry,
    call: &ServiceCall,
    exclusion: &ExclusionSet,
    strategy: &dyn RankingStrategy,
) -> Option<Arc<ServiceInstance>> {
    let service = call.service_name();
    if service.is_empty() {
        return None;
    }
    let mut candidates = registry.instances(service);
    if candidates.is_empty() {
        return None;
    }

    let total = candidates.len();
    candidates.retain(|i| i.is_ready());
    if candidates.len() < total {
        tracing::warn!(
            service = %service,
            not_ready = total - candidates.len(),
            "registry returned instances that are not ready"
        );
    }

    match candidates.len() {
        0 => return None,
        1 => {
            let only = candidates.swap_remove(0);
            if exclusion.contains(only.id()) {
                tracing::debug!(
                    service = %service,
                    instance = %only.id(),
                    "only instance is excluded"
                );
                return None;
            }
            return Some(only);
        }
        _ => {}
    }

    let pool = if exclusion.is_empty() {
        candidates
    } else {
        let usable: Vec<_> = candidates
            .iter()
            .filter(|i| !exclusion.contains(i.id()))
            .cloned()
            .collect();
        if usable.is_empty() {
            tracing::debug!(
                service = %service,
                excluded = exclusion.len(),
                "every ready instance excluded, ranking full pool"
            );
            candidates
        } else {
            usable
        }
    };

    let chosen = strategy.rank(&pool, call);
    if let Some(instance) = &chosen {
        tracing::debug!(
            service = %service,
            instance = %instance.id(),
            strategy = strategy.name(),
            pool = pool.len(),
            "instance selected"
        );
    }
    chosen
}

/// A registry paired with a ranking strategy.
pub struct LoadBalancer {
    registry: Arc<dyn ServiceRegistry>,
    strategy: Box<dyn RankingStrategy>,
}

impl LoadBalancer {
    pub fn new(registry: Arc<dyn ServiceRegistry>, strategy: Box<dyn RankingStrategy>) -> Self {
        Self { registry, strategy }
    }

    /// Pick the instance for the next attempt of `call`, skipping ids in
    /// `exclusion` where possible.
    pub fn choose_instance(
        &self,
        call: &ServiceCall,
        exclusion: &ExclusionSet,
    ) -> Option<Arc<ServiceInstance>> {
        choose(self.registry.as_ref(), call, exclusion, self.strategy.as_ref())
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
