//! # Contract Module
//!
//! Descriptor model and registration pass for hosted service contracts.
//!
//! A contract is declared once, upfront, through [`ServiceBuilder`] and
//! [`MethodBuilder`]: HTTP verb, explicit route template, display name,
//! required roles, deprecation metadata, and the single input/output type
//! of every method, plus the [`TypeDef`] shapes those types reference.
//! `build()` validates the declaration (one input parameter at most,
//! registered types only, distinct inline sequence numbers) and freezes it
//! into an immutable [`ServiceDescriptor`] graph.
//!
//! Everything downstream (route resolution, the route table, the request
//! binder, and the schema generator) reads from this graph and never from
//! ambient state.

mod build;
mod types;

pub use build::{MethodBuilder, ServiceBuilder};
pub use types::{
    BindingMode, JsonCasing, MethodDescriptor, ParameterBinding, PropertySpec, ServiceDescriptor,
    TargetType, TypeDef, TypeRegistry, UrlBinding,
};
