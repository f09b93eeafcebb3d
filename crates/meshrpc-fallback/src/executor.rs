//! Decides whether a failed call may degrade to its fallback, and runs it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use meshrpc_core::{CallStatus, FallbackClass, ServiceCall};
use serde_json::Value;

use crate::bean::FallbackBeanResolver;
use crate::binding::{FallbackArgs, FallbackInstance, FallbackType, MethodShape};
use crate::cache::FallbackCache;
use crate::error::FallbackError;
use crate::registry::FallbackRegistry;

/// Resolves and invokes fallback handlers for failed calls.
pub struct FallbackExecutor {
    types: Arc<FallbackRegistry>,
    cache: Arc<FallbackCache>,
    beans: Option<Arc<dyn FallbackBeanResolver>>,
}

impl FallbackExecutor {
    /// Executor with its own empty instance cache.
    pub fn new(types: Arc<FallbackRegistry>) -> Self {
        Self {
            types,
            cache: Arc::new(FallbackCache::new()),
            beans: None,
        }
    }

    /// Share an instance cache with other executors.
    pub fn with_cache(mut self, cache: Arc<FallbackCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_bean_resolver(mut self, resolver: Arc<dyn FallbackBeanResolver>) -> Self {
        self.beans = Some(resolver);
        self
    }

    pub fn cache(&self) -> &Arc<FallbackCache> {
        &self.cache
    }

    /// Whether `call` qualifies for fallback: it failed, fallback is enabled,
    /// and either a fallback type or a bean name is configured.
    pub fn executable(&self, call: &ServiceCall) -> bool {
        let config = call.config();
        call.status() == CallStatus::Failed
            && config.fallback_enabled
            && (!config.fallback_class.is_noop() || config.bean_name().is_some())
    }

    /// Run the fallback for `call`, logging and discarding any failure.
    ///
    /// `None` covers "nothing configured" as well as every error; use
    /// [`try_execute`](Self::try_execute) to tell them apart. Callers are
    /// expected to check [`executable`](Self::executable) first.
    pub fn execute(&self, call: &ServiceCall) -> Option<Value> {
        match self.try_execute(call) {
            Ok(result) => result,
            Err(e) if e.is_configuration() => {
                tracing::error!(
                    service = %call.service_name(),
                    method = %call.method(),
                    class = %e.class(),
                    error = %e,
                    "fallback is misconfigured"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    service = %call.service_name(),
                    method = %call.method(),
                    class = %e.class(),
                    error = %e,
                    "fallback invocation failed"
                );
                None
            }
        }
    }

    /// Run the fallback for `call`.
    ///
    /// Returns `Ok(None)` when no fallback type is configured and no bean
    /// could be resolved.
    pub fn try_execute(&self, call: &ServiceCall) -> Result<Option<Value>, FallbackError> {
        let config = call.config();
        match &config.fallback_class {
            FallbackClass::Named(class) => {
                let fallback = self
                    .types
                    .get(class)
                    .ok_or_else(|| FallbackError::UnknownFallback {
                        class: class.clone(),
                    })?;
                let instance = self.cache.get_or_create(&fallback)?;
                invoke(&fallback, &instance, call).map(Some)
            }
            FallbackClass::Noop => {
                let Some(name) = config.bean_name() else {
                    return Ok(None);
                };
                let Some(bean) = self.beans.as_ref().and_then(|r| r.resolve(name)) else {
                    tracing::debug!(bean = %name, "fallback bean not resolved");
                    return Ok(None);
                };
                invoke(&bean.fallback, &bean.instance, call).map(Some)
            }
        }
    }
}

impl std::fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("types", &self.types.len())
            .field("cache", &self.cache)
            .field("beans", &self.beans.is_some())
            .finish()
    }
}

fn invoke(
    fallback: &FallbackType,
    instance: &FallbackInstance,
    call: &ServiceCall,
) -> Result<Value, FallbackError> {
    let method = call.method();
    let Some((shape, handler)) = fallback.resolve(method) else {
        return Err(FallbackError::MethodNotFound {
            class: fallback.name().to_string(),
            method: method.to_string(),
        });
    };

    let args = match shape {
        MethodShape::FailureAware => FallbackArgs::new(call.failure(), call.args()),
        MethodShape::Exact => FallbackArgs::new(None, call.args()),
    };
    tracing::debug!(
        class = %fallback.name(),
        method = %method,
        shape = ?shape,
        "invoking fallback"
    );

    match catch_unwind(AssertUnwindSafe(|| handler(instance.as_ref(), args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(FallbackError::Handler {
            class: fallback.name().to_string(),
            method: method.to_string(),
            source,
        }),
        Err(payload) => Err(FallbackError::Panicked {
            class: fallback.name().to_string(),
            method: method.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
