//! # Dispatcher Module
//!
//! Channel-based method invocation on coroutines.
//!
//! Every contract method gets one long-lived handler coroutine fed through
//! an mpsc channel; dispatch sends a bound request in and blocks the
//! calling coroutine on a per-request reply channel. Panics inside a
//! handler are caught and surfaced as invocation failures, so a broken
//! method degrades to error responses instead of taking the process down.
//!
//! The invocation sequence is fixed: declarative role check, hook
//! authorization, before hooks, handler, after hooks. A failure at any
//! stage skips the rest.

pub(crate) mod core;

pub use core::{
    check_roles, Dispatcher, FileDownload, HandlerRequest, HandlerResult, HandlerSender,
    MethodOutput, Principal, ServiceHooks,
};
