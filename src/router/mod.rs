//! # Router Module
//!
//! Append-only route table mapping (verb, resolved path template) to
//! method descriptors.
//!
//! Templates are compiled to anchored regexes at registration; matching a
//! request is a scan over same-verb candidates with the fewest-wildcards
//! rule deciding between overlapping templates. Any pair of templates that
//! could tie is rejected when the table is built, so lookup never has to
//! resolve an ambiguity at request time.
//!
//! After construction the table is read-only and safe for concurrent
//! lookup by arbitrarily many in-flight requests.

pub(crate) mod core;

pub use core::{ParamVec, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
