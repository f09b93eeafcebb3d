//! meshrpc-lb — instance selection for MeshRPC.
//!
//! # Overview
//!
//! [`choose`] is the fixed orchestration every selection runs through:
//!
//! ```text
//! registry snapshot → drop not-ready → single-instance shortcut
//!                   → apply exclusions → RankingStrategy::rank
//! ```
//!
//! Strategies only implement the last step:
//!
//! - [`RoundRobin`] — rotate through the pool
//! - [`WeightedRandom`] — weight-proportional pick with warmup ramp ([`weight`])
//! - [`ConsistentHash`] — sticky pick keyed by service, method and arguments

pub mod balancer;
pub mod config;
pub mod strategy;
pub mod weight;

pub use balancer::{choose, LoadBalancer};
pub use config::{BalancerConfig, StrategyKind};
pub use strategy::{
    ConsistentHash, ConsistentHashConfig, RankingStrategy, RoundRobin, WeightedRandom,
};
pub use weight::{effective_weight, warmup_weight, WeightConfig};
