//! The `ServiceRegistry` trait and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::RegistryError;
use crate::instance::{InstanceRecord, ServiceInstance};

/// Source of instance snapshots for a service.
///
/// # Thread Safety
/// Implementations are queried concurrently by every in-flight selection and
/// must be `Send + Sync`. The returned vector is the caller's working copy;
/// filtering it never affects registry state.
pub trait ServiceRegistry: Send + Sync {
    /// All known instances of `service`, ready or not. May be empty.
    fn instances(&self, service: &str) -> Vec<Arc<ServiceInstance>>;
}

/// In-memory registry, typically loaded from a JSON snapshot.
///
/// Snapshot format: an object mapping service names to instance records.
/// ```json
/// { "UserService": [ { "id": "u1", "host": "10.0.0.1", "port": 8080 } ] }
/// ```
#[derive(Default)]
pub struct StaticRegistry {
    services: RwLock<HashMap<String, Vec<Arc<ServiceInstance>>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let snapshot: HashMap<String, Vec<InstanceRecord>> = serde_json::from_str(json)?;
        let registry = Self::new();
        for (service, records) in snapshot {
            registry.declare(&service);
            for record in records {
                let id = record.id.clone();
                let instance = ServiceInstance::from_record(service.clone(), record);
                if !registry.register(Arc::new(instance)) {
                    return Err(RegistryError::DuplicateInstance { service, id });
                }
            }
        }
        Ok(registry)
    }

    /// Make `service` known even while it has no instances.
    pub fn declare(&self, service: &str) {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        services.entry(service.to_string()).or_default();
    }

    /// Add an instance. Returns `false` if its id is already registered for
    /// the same service.
    pub fn register(&self, instance: Arc<ServiceInstance>) -> bool {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        let list = services
            .entry(instance.service_name().to_string())
            .or_default();
        if list.iter().any(|i| i.id() == instance.id()) {
            tracing::warn!(
                service = %instance.service_name(),
                instance = %instance.id(),
                "duplicate instance ignored"
            );
            return false;
        }
        list.push(instance);
        true
    }

    /// Remove an instance. Returns `true` if it was present.
    pub fn deregister(&self, service: &str, id: &str) -> bool {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        let Some(list) = services.get_mut(service) else {
            return false;
        };
        let before = list.len();
        list.retain(|i| i.id() != id);
        before != list.len()
    }

    /// Flip readiness of a registered instance. Returns `false` if unknown.
    pub fn set_ready(&self, service: &str, id: &str, ready: bool) -> bool {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        match services
            .get(service)
            .and_then(|list| list.iter().find(|i| i.id() == id))
        {
            Some(instance) => {
                instance.set_ready(ready);
                true
            }
            None => false,
        }
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<String> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ServiceRegistry for StaticRegistry {
    fn instances(&self, service: &str) -> Vec<Arc<ServiceInstance>> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        services.get(service).cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticRegistry")
            .field("services", &self.services())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "UserService": [
            { "id": "u1", "host": "10.0.0.1", "port": 8080, "props": { "weight": 10 } },
            { "id": "u2", "host": "10.0.0.2", "port": 8080, "ready": false }
        ],
        "OrderService": []
    }"#;

    #[test]
    fn loads_snapshot() {
        let reg = StaticRegistry::from_json(SNAPSHOT).unwrap();
        assert_eq!(reg.services(), vec!["OrderService", "UserService"]);
        let users = reg.instances("UserService");
        assert_eq!(users.len(), 2);
        assert!(!users[1].is_ready());
        assert_eq!(users[0].prop("weight", 100), 10);
    }

    #[test]
    fn declared_service_without_instances_is_listed() {
        let reg = StaticRegistry::from_json(r#"{ "OrderService": [] }"#).unwrap();
        assert_eq!(reg.services(), vec!["OrderService"]);
        assert!(reg.instances("OrderService").is_empty());
    }

    #[test]
    fn unknown_service_is_empty() {
        let reg = StaticRegistry::new();
        assert!(reg.instances("Nope").is_empty());
    }

    #[test]
    fn duplicate_id_rejected() {
        let json = r#"{"X": [
            {"id": "a", "host": "h", "port": 1},
            {"id": "a", "host": "h", "port": 2}
        ]}"#;
        match StaticRegistry::from_json(json) {
            Err(RegistryError::DuplicateInstance { service, id }) => {
                assert_eq!(service, "X");
                assert_eq!(id, "a");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn set_ready_is_visible_in_snapshots() {
        let reg = StaticRegistry::from_json(SNAPSHOT).unwrap();
        let before = reg.instances("UserService");
        assert!(reg.set_ready("UserService", "u2", true));
        assert!(before[1].is_ready());
        assert!(!reg.set_ready("UserService", "nope", true));
    }

    #[test]
    fn deregister_removes_instance() {
        let reg = StaticRegistry::from_json(SNAPSHOT).unwrap();
        assert!(reg.deregister("UserService", "u1"));
        assert!(!reg.deregister("UserService", "u1"));
        assert_eq!(reg.instances("UserService").len(), 1);
    }
}
