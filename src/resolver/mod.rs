//! # Resolver Module
//!
//! Turns one method's declarative metadata into its single authoritative
//! route. Explicit route templates, name-derived routes, and inline
//! parameter bindings all funnel through one deterministic rule, evaluated
//! once per method.
//!
//! Both the route table and the schema generator consume [`resolve_route`];
//! there is no second code path that could let documentation drift from
//! dispatch behavior.

mod core;

pub use core::{resolve_route, ResolvedRoute};
