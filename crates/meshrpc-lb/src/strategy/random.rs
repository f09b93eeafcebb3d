//! Weighted random ranking with warmup-adjusted weights.

use std::sync::Arc;
use std::time::SystemTime;

use meshrpc_core::{ServiceCall, ServiceInstance};
use rand::Rng;

use super::RankingStrategy;
use crate::weight::{effective_weight, WeightConfig};

/// Picks an instance with probability proportional to its effective weight.
///
/// When every instance has the same weight, or all weights are zero, the
/// pick is uniform.
#[derive(Debug, Clone, Default)]
pub struct WeightedRandom {
    weights: WeightConfig,
}

impl WeightedRandom {
    pub fn new(weights: WeightConfig) -> Self {
        Self { weights }
    }

    /// Rank with an explicit clock and random source.
    pub fn rank_with<R: Rng>(
        &self,
        pool: &[Arc<ServiceInstance>],
        now: SystemTime,
        rng: &mut R,
    ) -> Option<Arc<ServiceInstance>> {
        if pool.is_empty() {
            return None;
        }
        let weights: Vec<u64> = pool
            .iter()
            .map(|i| u64::from(effective_weight(i, now, &self.weights)))
            .collect();
        let total: u64 = weights.iter().sum();
        let same_weight = weights.windows(2).all(|w| w[0] == w[1]);

        if total > 0 && !same_weight {
            let mut offset = rng.random_range(0..total);
            for (instance, weight) in pool.iter().zip(&weights) {
                if offset < *weight {
                    return Some(instance.clone());
                }
                offset -= weight;
            }
        }
        Some(pool[rng.random_range(0..pool.len())].clone())
    }
}

impl RankingStrategy for WeightedRandom {
    fn name(&self) -> &'static str {
        "random"
    }

    fn rank(

        &self,

        pool: &[Arc<ServiceInstance>],

        _call: &ServiceCall,

    ) -> Option<Arc<ServiceInstance>> {
        self.rank_with(pool, SystemTime::now(), &mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::PROP_WEIGHT;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn weighted(id: &str, weight: i64) -> Arc<ServiceInstance> {
        Arc::new(ServiceInstance::new("X", id, "h", 1).with_prop(PROP_WEIGHT, weight))
    }

    fn tally(pool: &[Arc<ServiceInstance>], n: usize) -> HashMap<String, usize> {
        let strategy = WeightedRandom::default();
        let mut rng = StdRng::seed_from_u64(7);
        let now = SystemTime::now();
        let mut counts = HashMap::new();
        for _ in 0..n {
            let pick = strategy.rank_with(pool, now, &mut rng).unwrap();
            *counts.entry(pick.id().to_string()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn zero_weight_never_picked_when_others_positive() {
        let pool = vec![weighted("a", 0), weighted("b", 10)];
        let counts = tally(&pool, 500);
        assert_eq!(counts.get("a"), None);
        assert_eq!(counts["b"], 500);
    }

    #[test]
    fn heavier_instance_gets_more_traffic() {
        let pool = vec![weighted("light", 10), weighted("heavy", 90)];
        let counts = tally(&pool, 5_000);
        let heavy = counts["heavy"];
        assert!(heavy > 4_000 && heavy < 4_900, "heavy={heavy}");
    }

    #[test]
    fn equal_weights_cover_every_instance() {
        let pool = vec![weighted("a", 5), weighted("b", 5), weighted("c", 5)];
        let counts = tally(&pool, 600);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn all_zero_weights_still_pick() {
        let pool = vec![weighted("a", 0), weighted("b", 0)];
        assert_eq!(tally(&pool, 10).values().sum::<usize>(), 10);
    }
}
