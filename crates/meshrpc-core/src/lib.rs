//! meshrpc-core — foundation types shared by the MeshRPC decision engines.
//!
//! # Overview
//!
//! MeshRPC's resilience layer answers two questions for an outgoing call:
//! which instance should receive it, and what should run instead when the
//! remote call fails. This crate defines the inputs both engines read:
//!
//! - [`ServiceCall`] / [`CallConfig`] — one attempted invocation and its policy
//! - [`ServiceInstance`] — an addressable replica with readiness and properties
//! - [`ServiceRegistry`] — the snapshot source the selector consumes
//! - [`CallError`] — the standard failure reason carried by failed calls

pub mod call;
pub mod error;
pub mod instance;
pub mod registry;

pub use call::{
    CallConfig, CallStatus, ExclusionSet, FallbackClass, MethodSignature, ParamType, ServiceCall,
};
pub use error::{CallError, RegistryError};
pub use instance::{InstanceRecord, ServiceInstance};
pub use registry::{ServiceRegistry, StaticRegistry};
