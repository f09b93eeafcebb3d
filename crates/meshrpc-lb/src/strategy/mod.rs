//! Ranking strategies — the pluggable last step of instance selection.
//!
//! The orchestration in [`crate::balancer`] validates, filters and applies
//! exclusions; a strategy only ranks an already non-empty pool of ready
//! instances.

pub mod consistent_hash;
pub mod random;
pub mod round_robin;

use std::sync::Arc;

use meshrpc_core::{ServiceCall, ServiceInstance};

pub use consistent_hash::{ConsistentHash, ConsistentHashConfig};
pub use random::WeightedRandom;
pub use round_robin::RoundRobin;

/// Picks one instance out of a pool of ready candidates.
///
/// # Thread Safety
/// A single strategy value serves every concurrent selection and must be
/// `Send + Sync`.
pub trait RankingStrategy: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Choose from `pool`, which the caller guarantees is non-empty. The call
    /// is available for hash-based or sticky strategies.
    fn rank(
        &self,
        pool: &[Arc<ServiceInstance>],
        call: &ServiceCall,
    ) -> Option<Arc<ServiceInstance>>;
}
