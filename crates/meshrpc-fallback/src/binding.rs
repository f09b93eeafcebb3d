//! Fallback types: a constructor plus a table of handlers keyed by method
//! signature, built once at registration.
//!
//! ```
//! use meshrpc_fallback::FallbackType;
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct UserFallback;
//!
//! let fallback = FallbackType::builder::<UserFallback>("UserFallback")
//!     .default_constructor()
//!     .on_failure("get", ["i64"], |_this, args| {
//!         let id: i64 = args.arg(0)?;
//!         Ok(json!({ "id": id, "name": "guest" }))
//!     })
//!     .build();
//! assert_eq!(fallback.method_count(), 1);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use meshrpc_core::{CallError, MethodSignature, ParamType};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;

/// A constructed fallback instance, type-erased.
pub type FallbackInstance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn() -> FallbackInstance + Send + Sync>;

type ErasedInstance = dyn Any + Send + Sync;

pub(crate) type Handler =
    Arc<dyn Fn(&ErasedInstance, FallbackArgs<'_>) -> Result<Value, HandlerError> + Send + Sync>;

/// Which shape of handler matched a failed method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodShape {
    /// `name(CallError, p0, p1, …)`: receives the failure reason first.
    FailureAware,
    /// `name(p0, p1, …)`: receives the original arguments only.
    Exact,
}

/// Arguments handed to a fallback handler.
#[derive(Debug, Clone, Copy)]
pub struct FallbackArgs<'a> {
    failure: Option<&'a CallError>,
    values: &'a [Value],
}

impl<'a> FallbackArgs<'a> {
    pub fn new(failure: Option<&'a CallError>, values: &'a [Value]) -> Self {
        Self { failure, values }
    }

    /// The failure reason. Always `None` for [`MethodShape::Exact`] handlers.
    pub fn failure(&self) -> Option<&'a CallError> {
        self.failure
    }

    /// The original call arguments.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserialize the `idx`-th original argument.
    pub fn arg<T: DeserializeOwned>(&self, idx: usize) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| format!("missing argument {idx}"))?;
        Ok(T::deserialize(value)?)
    }
}

/// A registered fallback implementation.
pub struct FallbackType {
    name: String,
    type_id: TypeId,
    constructor: Option<Constructor>,
    methods: HashMap<MethodSignature, Handler>,
}

impl FallbackType {
    pub fn builder<T: Send + Sync + 'static>(name: impl Into<String>) -> FallbackTypeBuilder<T> {
        FallbackTypeBuilder {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            constructor: None,
            methods: HashMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concrete implementation type the handlers downcast to.
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Which handler shape would serve a failure of `method`, if any.
    pub fn shape_for(&self, method: &MethodSignature) -> Option<MethodShape> {
        self.resolve(method).map(|(shape, _)| shape)
    }

    pub(crate) fn construct(&self) -> Option<FallbackInstance> {
        self.constructor.as_ref().map(|c| c())
    }

    /// Failure-aware handler first, exact signature second.
    pub(crate) fn resolve(&self, method: &MethodSignature) -> Option<(MethodShape, &Handler)> {
        if let Some(handler) = self.methods.get(&method.with_failure()) {
            return Some((MethodShape::FailureAware, handler));
        }
        self.methods
            .get(method)
            .map(|handler| (MethodShape::Exact, handler))
    }
}

impl std::fmt::Debug for FallbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<String> = self.methods.keys().map(ToString::to_string).collect();
        methods.sort();
        f.debug_struct("FallbackType")
            .field("name", &self.name)
            .field("constructor", &self.constructor.is_some())
            .field("methods", &methods)
            .finish()
    }
}

/// Builder for [`FallbackType`] over the concrete implementation `T`.
pub struct FallbackTypeBuilder<T> {
    name: String,
    type_id: TypeId,
    constructor: Option<Constructor>,
    methods: HashMap<MethodSignature, Handler>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> FallbackTypeBuilder<T> {
    /// How to build the single shared instance.
    pub fn constructor<F>(mut self, make: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move || Arc::new(make()) as FallbackInstance));
        self
    }

    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Register a handler for exactly `name(params…)`.
    ///
    /// To receive the failure reason, start `params` with
    /// [`ParamType::FAILURE`] or use [`on_failure`](Self::on_failure).
    pub fn method<P, F>(
        mut self,
        name: &str,
        params: impl IntoIterator<Item = P>,
        handler: F,
    ) -> Self
    where
        P: Into<ParamType>,
        F: Fn(&T, FallbackArgs<'_>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let signature = MethodSignature::new(name, params);
        let class = self.name.clone();
        let erased: Handler = Arc::new(
            move |instance: &ErasedInstance, args: FallbackArgs<'_>| match instance
                .downcast_ref::<T>()
            {
                Some(this) => handler(this, args),
                None => Err(format!("instance is not a {class}").into()),
            },
        );
        self.methods.insert(signature, erased);
        self
    }

    /// Register a handler for `name(CallError, params…)`.
    pub fn on_failure<P, F>(
        self,
        name: &str,
        params: impl IntoIterator<Item = P>,
        handler: F,
    ) -> Self
    where
        P: Into<ParamType>,
        F: Fn(&T, FallbackArgs<'_>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let params =
            std::iter::once(ParamType::FAILURE).chain(params.into_iter().map(Into::into));
        self.method(name, params, handler)
    }

    pub fn build(self) -> FallbackType {
        FallbackType {
            name: self.name,
            type_id: self.type_id,
            constructor: self.constructor,
            methods: self.methods,
        }
    }
}
