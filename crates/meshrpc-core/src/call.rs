//! Call descriptors: the method being invoked, its arguments, status and policy.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CallError;

/// Lifecycle status of a [`ServiceCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Created, not yet dispatched.
    Pending,
    /// Dispatched to an instance, awaiting the outcome.
    Started,
    /// Completed with a result.
    Success,
    /// Completed with a [`CallError`].
    Failed,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Started => write!(f, "started"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Name of a parameter type in a method signature (e.g. `"i64"`, `"User"`).
///
/// Types are compared by name only; the failure reason slot of a
/// failure-aware fallback signature is [`ParamType::FAILURE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamType(Cow<'static, str>);

impl ParamType {
    /// The parameter type standing for [`CallError`].
    pub const FAILURE: ParamType = ParamType(Cow::Borrowed("CallError"));

    pub const fn of(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ParamType {
    fn from(name: &'static str) -> Self {
        Self::of(name)
    }
}

impl From<String> for ParamType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name and ordered parameter types of the remote method being called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamType>,
}

impl MethodSignature {
    pub fn new<P>(name: impl Into<String>, params: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<ParamType>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// The same method with the failure reason prepended to the parameters.
    pub fn with_failure(&self) -> Self {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(ParamType::FAILURE);
        params.extend(self.params.iter().cloned());
        Self {
            name: self.name.clone(),
            params,
        }
    }
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

/// Which fallback type a call degrades to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackClass {
    /// Fallback type deliberately unset.
    #[default]
    Noop,
    /// A fallback type registered under this name.
    Named(String),
}

impl FallbackClass {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }

    /// The registered type name, or `None` for the no-op sentinel.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Noop => None,
            Self::Named(name) => Some(name),
        }
    }
}

/// Per-call degradation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Whether a failed call may be served by its fallback.
    pub fallback_enabled: bool,
    /// Fallback type resolved through the fallback registry.
    pub fallback_class: FallbackClass,
    /// Named fallback bean resolved by an external lookup.
    pub fallback_bean: Option<String>,
}

impl CallConfig {
    /// Config with fallback enabled and routed to a registered type.
    pub fn with_fallback(class: impl Into<String>) -> Self {
        Self {
            fallback_enabled: true,
            fallback_class: FallbackClass::named(class),
            fallback_bean: None,
        }
    }

    /// Config with fallback enabled and routed to a named bean.
    pub fn with_fallback_bean(bean: impl Into<String>) -> Self {
        Self {
            fallback_enabled: true,
            fallback_class: FallbackClass::Noop,
            fallback_bean: Some(bean.into()),
        }
    }

    /// The bean name, if one is configured and non-empty.
    pub fn bean_name(&self) -> Option<&str> {
        self.fallback_bean.as_deref().filter(|b| !b.is_empty())
    }
}

/// Instance ids already tried and failed within one logical call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instance as tried. Returns `false` if it was already excluded.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// One attempted invocation of a remote method on a named service.
///
/// Owned by the dispatcher; the selection and fallback engines only read it.
#[derive(Debug, Clone)]
pub struct ServiceCall {
    service_name: String,
    method: MethodSignature,
    args: Vec<Value>,
    status: CallStatus,
    config: Arc<CallConfig>,
    failure: Option<CallError>,
}

impl ServiceCall {
    pub fn new(
        service_name: impl Into<String>,
        method: MethodSignature,
        args: Vec<Value>,
        config: Arc<CallConfig>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method,
            args,
            status: CallStatus::Pending,
            config,
            failure: None,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    /// The error that failed this call, once it has failed.
    pub fn failure(&self) -> Option<&CallError> {
        self.failure.as_ref()
    }

    pub fn start(&mut self) {
        self.status = CallStatus::Started;
    }

    pub fn succeed(&mut self) {
        self.status = CallStatus::Success;
        self.failure = None;
    }

    pub fn fail(&mut self, error: CallError) {
        tracing::debug!(
            service = %self.service_name,
            method = %self.method,
            error = %error,
            "call failed"
        );
        self.status = CallStatus::Failed;
        self.failure = Some(error);
    }
}
