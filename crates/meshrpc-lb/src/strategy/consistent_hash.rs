//! Consistent-hash ranking: calls with the same key stick to one instance.
//!
//! Every instance is placed on a 64-bit ring at `virtual_nodes` points derived
//! from its id. A call hashes its service, method name and leading arguments
//! and lands on the first ring point at or after that hash, wrapping around.
//! Because ring points depend only on instance ids, pool order is irrelevant
//! and removing one instance only remaps the keys it owned.

use std::sync::Arc;

use meshrpc_core::{ServiceCall, ServiceInstance};
use serde::{Deserialize, Serialize};

use super::RankingStrategy;

/// Configuration for [`ConsistentHash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistentHashConfig {
    /// Ring points per instance.
    pub virtual_nodes: u32,
    /// How many leading call arguments feed the request key.
    pub hash_arguments: usize,
}

impl Default for ConsistentHashConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: 160,
            hash_arguments: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsistentHash {
    config: ConsistentHashConfig,
}

impl ConsistentHash {
    pub fn new(config: ConsistentHashConfig) -> Self {
        Self { config }
    }

    fn request_key(&self, call: &ServiceCall) -> String {
        let mut key = format!("{}.{}", call.service_name(), call.method().name);
        for arg in call.args().iter().take(self.config.hash_arguments) {
            key.push(':');
            key.push_str(&arg.to_string());
        }
        key
    }

    /// Ring point of the `vnode`-th virtual node of instance `id`.
    fn point(id: &str, vnode: u32) -> u64 {
        finalize(fnv1a(fnv1a(FNV_OFFSET, id.as_bytes()), &vnode.to_le_bytes()))
    }
}

impl RankingStrategy for ConsistentHash {
    fn name(&self) -> &'static str {
        "consistent-hash"
    }

    /// Walks every virtual node once without materializing the ring: the
    /// owner is the lowest point at or after the key, or the lowest point
    /// overall when the key wraps past the end. Equal points go to the
    /// smaller id.
    fn rank(
        &self,
        pool: &[Arc<ServiceInstance>],
        call: &ServiceCall,
    ) -> Option<Arc<ServiceInstance>> {
        let key = hash(self.request_key(call).as_bytes());
        let mut after: Option<(u64, &Arc<ServiceInstance>)> = None;
        let mut lowest: Option<(u64, &Arc<ServiceInstance>)> = None;

        for instance in pool {
            for vnode in 0..self.config.virtual_nodes.max(1) {
                let point = Self::point(instance.id(), vnode);
                if point >= key && precedes(point, instance, after) {
                    after = Some((point, instance));
                }
                if precedes(point, instance, lowest) {
                    lowest = Some((point, instance));
                }
            }
        }
        after.or(lowest).map(|(_, instance)| instance.clone())
    }
}

fn precedes(
    point: u64,
    instance: &ServiceInstance,
    current: Option<(u64, &Arc<ServiceInstance>)>,
) -> bool {
    match current {
        None => true,
        Some((best, owner)) => (point, instance.id()) < (best, owner.id()),
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

fn fnv1a(mut h: u64, data: &[u8]) -> u64 {
    for &byte in data {
        h ^= u64::from(byte);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

/// 64-bit finalizer so short, similar keys spread across the whole ring.
fn finalize(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

fn hash(data: &[u8]) -> u64 {
    finalize(fnv1a(FNV_OFFSET, data))
}
