//! # Schema Module
//!
//! OpenAPI 3.0 document generation from registered service descriptors.
//!
//! The generator walks the same descriptor graph the route table is built
//! from and resolves routes with the same resolver, so the document can
//! never drift from what dispatch actually serves. Output maps are
//! key-ordered; generating twice from the same descriptors produces
//! byte-identical JSON.

pub(crate) mod core;

pub use core::{build_document, ApiInfo};
