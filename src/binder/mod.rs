//! # Binder Module
//!
//! Converts an inbound request's path captures, query string, and body
//! bytes into one typed input object for the target method.
//!
//! The precedence rule is the contract the rest of the system is built
//! around: body seeds, query refines, path wins. Service authors rely on
//! the same property being satisfiable from any of the three sources, so
//! the order is fixed and covered by tests.

mod convert;
pub(crate) mod core;

pub use convert::{convert, MIN_DATE_TIME, NIL_UUID};
pub use core::bind_input;
