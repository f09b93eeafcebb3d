//! Balancer configuration.

use std::str::FromStr;
use std::sync::Arc;

use meshrpc_core::ServiceRegistry;
use serde::{Deserialize, Serialize};

use crate::balancer::LoadBalancer;
use crate::strategy::{
    ConsistentHash, ConsistentHashConfig, RankingStrategy, RoundRobin, WeightedRandom,
};
use crate::weight::WeightConfig;

/// Which ranking strategy a balancer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    RoundRobin,
    #[default]
    Random,
    ConsistentHash,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundRobin => write!(f, "round-robin"),
            Self::Random => write!(f, "random"),
            Self::ConsistentHash => write!(f, "consistent-hash"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "random" | "weighted-random" => Ok(Self::Random),
            "consistent-hash" | "hash" => Ok(Self::ConsistentHash),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// Configuration for a [`LoadBalancer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub strategy: StrategyKind,
    /// Weight defaults for weight-aware strategies.
    pub weight: WeightConfig,
    pub consistent_hash: ConsistentHashConfig,
}

impl BalancerConfig {
    pub fn with_strategy(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn build_strategy(&self) -> Box<dyn RankingStrategy> {
        match self.strategy {
            StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
            StrategyKind::Random => Box::new(WeightedRandom::new(self.weight.clone())),
            StrategyKind::ConsistentHash => {
                Box::new(ConsistentHash::new(self.consistent_hash.clone()))
            }
        }
    }

    pub fn build(&self, registry: Arc<dyn ServiceRegistry>) -> LoadBalancer {
        LoadBalancer::new(registry, self.build_strategy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshrpc_core::StaticRegistry;

    #[test]
    fn default_is_weighted_random() {
        let cfg = BalancerConfig::default();
        assert_eq!(cfg.strategy, StrategyKind::Random);
        assert_eq!(cfg.weight.default_weight, 100);
        assert_eq!(cfg.consistent_hash.virtual_nodes, 160);
    }

    #[test]
    fn parses_partial_json() {
        let cfg: BalancerConfig = serde_json::from_str(
            r#"{"strategy": "consistent-hash", "consistent_hash": {"hash_arguments": 2}}"#,
        )
        .unwrap();
        assert_eq!(cfg.strategy, StrategyKind::ConsistentHash);
        assert_eq!(cfg.consistent_hash.hash_arguments, 2);
        assert_eq!(cfg.consistent_hash.virtual_nodes, 160);
    }

    #[test]
    fn strategy_names_round_trip() {
        for kind in [StrategyKind::RoundRobin, StrategyKind::Random, StrategyKind::ConsistentHash] {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
            let lb = BalancerConfig::with_strategy(kind).build(Arc::new(StaticRegistry::new()));
            assert_eq!(lb.strategy_name(), kind.to_string());
        }
        assert!("fastest".parse::<StrategyKind>().is_err());
    }
}
