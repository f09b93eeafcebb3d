//! Service instances: one addressable replica of a service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One addressable endpoint of a service.
///
/// Identity, address and properties are fixed at construction. Readiness is
/// flipped by the registry as health changes and only observed by the
/// selector.
#[derive(Debug)]
pub struct ServiceInstance {
    id: String,
    service_name: String,
    host: String,
    port: u16,
    ready: AtomicBool,
    start_time: Option<SystemTime>,
    props: HashMap<String, Value>,
}

impl ServiceInstance {
    /// A ready instance with no start time and no properties.
    pub fn new(
        service_name: impl Into<String>,
        id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service_name: service_name.into(),
            host: host.into(),
            port,
            ready: AtomicBool::new(true),
            start_time: None,
            props: HashMap::new(),
        }
    }

    pub fn with_ready(self, ready: bool) -> Self {
        self.ready.store(ready, Ordering::Release);
        self
    }

    pub fn with_start_time(mut self, at: SystemTime) -> Self {
        self.start_time = Some(at);
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` of this instance.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn start_time(&self) -> Option<SystemTime> {
        self.start_time
    }

    pub fn props(&self) -> &HashMap<String, Value> {
        &self.props
    }

    /// Read a property, falling back to `default` when it is missing or does
    /// not convert to `T`. String values are parsed as JSON, so `"100"` reads
    /// as a number.
    pub fn prop<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.props.get(key) else {
            return default;
        };
        if let Ok(v) = T::deserialize(value) {
            return v;
        }
        match value {
            Value::String(s) => serde_json::from_str(s).unwrap_or(default),
            _ => default,
        }
    }

    /// Build from a snapshot record of `service`.
    pub fn from_record(service_name: impl Into<String>, record: InstanceRecord) -> Self {
        Self {
            id: record.id,
            service_name: service_name.into(),
            host: record.host,
            port: record.port,
            ready: AtomicBool::new(record.ready),
            start_time: record
                .start_time_ms
                .map(|ms| UNIX_EPOCH + Duration::from_millis(ms)),
            props: record.props,
        }
    }

    /// Snapshot of this instance's current state.
    pub fn to_record(&self) -> InstanceRecord {
        InstanceRecord {
            id: self.id.clone(),
            host: self.host.clone(),
            port: self.port,
            ready: self.is_ready(),
            start_time_ms: self
                .start_time
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64),
            props: self.props.clone(),
        }
    }
}

/// Serialized form of a [`ServiceInstance`] inside a registry snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_ready")]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub props: HashMap<String, Value>,
}

fn default_ready() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_reads_typed_value() {
        let inst = ServiceInstance::new("X", "1", "10.0.0.1", 8080).with_prop("weight", 10);
        assert_eq!(inst.prop("weight", 100), 10);
        assert_eq!(inst.prop("warmup", 600_000u64), 600_000);
    }

    #[test]
    fn prop_parses_string_value() {
        let inst = ServiceInstance::new("X", "1", "10.0.0.1", 8080).with_prop("weight", "25");
        assert_eq!(inst.prop("weight", 100), 25);
    }

    #[test]
    fn prop_falls_back_on_mismatch() {
        let inst = ServiceInstance::new("X", "1", "10.0.0.1", 8080).with_prop("weight", "heavy");
        assert_eq!(inst.prop("weight", 100), 100);
    }

    #[test]
    fn readiness_is_observed() {
        let inst = ServiceInstance::new("X", "1", "10.0.0.1", 8080).with_ready(false);
        assert!(!inst.is_ready());
        inst.set_ready(true);
        assert!(inst.is_ready());
    }

    #[test]
    fn record_keeps_start_time() {
        let record: InstanceRecord = serde_json::from_str(
            r#"{"id": "a", "host": "h", "port": 1, "start_time_ms": 1700000000000}"#,
        )
        .unwrap();
        assert!(record.ready);
        let inst = ServiceInstance::from_record("X", record.clone());
        assert_eq!(inst.address(), "h:1");
        assert_eq!(inst.to_record(), record);
    }
}
