//! meshrpc-fallback — graceful degradation for failed MeshRPC calls.
//!
//! # Overview
//!
//! A fallback type is registered once as a table of handlers keyed by method
//! signature ([`FallbackType`]). When a call fails, [`FallbackExecutor`]:
//!
//! 1. checks the call qualifies ([`FallbackExecutor::executable`])
//! 2. fetches the type's single shared instance from the [`FallbackCache`]
//! 3. resolves `name(CallError, params…)`, else `name(params…)`
//! 4. invokes it and returns its value in place of the remote result
//!
//! Handler errors and panics never propagate to the caller:
//! [`FallbackExecutor::execute`] logs them and yields `None`, while
//! [`FallbackExecutor::try_execute`] reports a [`FallbackError`].

pub mod bean;
pub mod binding;
pub mod cache;
pub mod error;
pub mod executor;
pub mod registry;

pub use bean::{FallbackBean, FallbackBeanResolver};
pub use binding::{
    FallbackArgs, FallbackInstance, FallbackType, FallbackTypeBuilder, MethodShape,
};
pub use cache::FallbackCache;
pub use error::{FallbackError, HandlerError};
pub use executor::FallbackExecutor;
pub use registry::FallbackRegistry;
