//! Round-robin ranking over the candidate pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use meshrpc_core::{ServiceCall, ServiceInstance};

use super::RankingStrategy;

/// Rotates through the pool with a shared atomic cursor.
///
/// The cursor is not keyed by service; it only guarantees that consecutive
/// picks over the same pool visit every instance in turn.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RankingStrategy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn rank(

        &self,

        pool: &[Arc<ServiceInstance>],

        _call: &ServiceCall,

    ) -> Option<Arc<ServiceInstance>> {
        if pool.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % pool.len();
        Some(pool[idx].clone())
    }
}
