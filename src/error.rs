//! Error types for the registration, binding, and dispatch stages.
//!
//! Registration errors are fatal configuration mistakes and abort startup;
//! binding and dispatch errors are per-request and map onto response
//! statuses at the host boundary.

use http::Method;
use std::error::Error;
use std::fmt;

/// Contract or route-table construction failure. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Two methods resolved to the identical (verb, path) pair.
    DuplicateRoute { verb: Method, path: String },
    /// Two templates overlap with equal wildcard counts, so no concrete
    /// request could ever pick a unique winner.
    AmbiguousRoute {
        verb: Method,
        first: String,
        second: String,
    },
    /// A method declared more than one input parameter.
    TooManyParameters { method: String },
    /// A method references a type that was never registered.
    UnknownType { method: String, type_name: String },
    /// Two inline properties of one method share a sequence number.
    DuplicateSequence {
        method: String,
        property: String,
        sequence: i32,
    },
    /// A route template contains a malformed placeholder.
    InvalidRouteTemplate { method: String, template: String },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicateRoute { verb, path } => {
                write!(f, "duplicate route: {verb} {path} is registered twice")
            }
            RegistrationError::AmbiguousRoute {
                verb,
                first,
                second,
            } => write!(
                f,
                "ambiguous routes for {verb}: '{first}' and '{second}' overlap with equal wildcard counts"
            ),
            RegistrationError::TooManyParameters { method } => {
                write!(f, "method '{method}' declares more than one input parameter")
            }
            RegistrationError::UnknownType { method, type_name } => {
                if method.is_empty() {
                    write!(f, "type '{type_name}' is not registered")
                } else {
                    write!(
                        f,
                        "method '{method}' references unregistered type '{type_name}'"
                    )
                }
            }
            RegistrationError::DuplicateSequence {
                method,
                property,
                sequence,
            } => write!(
                f,
                "method '{method}': property '{property}' reuses inline sequence {sequence}"
            ),
            RegistrationError::InvalidRouteTemplate { method, template } => {
                write!(f, "method '{method}': malformed route template '{template}'")
            }
        }
    }
}

impl Error for RegistrationError {}

/// Per-request input construction failure. Maps to a 400 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The request body was not a JSON object.
    InvalidBody { detail: String },
    /// A URL value could not be converted to the property's declared type.
    Unparseable {
        property: String,
        value: String,
        target: String,
    },
    /// The property's declared type cannot be sourced from a URL at all.
    UnsupportedTarget { property: String, target: String },
    /// The method's input type vanished from the registry. Indicates a
    /// descriptor graph built outside the service builder.
    UnknownInputType { type_name: String },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::InvalidBody { detail } => {
                write!(f, "invalid request body: {detail}")
            }
            BindingError::Unparseable {
                property,
                value,
                target,
            } => write!(
                f,
                "cannot convert '{value}' to {target} for property '{property}'"
            ),
            BindingError::UnsupportedTarget { property, target } => write!(
                f,
                "property '{property}' has type {target}, which cannot be bound from a URL"
            ),
            BindingError::UnknownInputType { type_name } => {
                write!(f, "input type '{type_name}' is not registered")
            }
        }
    }
}

impl Error for BindingError {}

/// Dispatch-stage failure. Maps to 401, 500, or 503 at the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The caller does not satisfy the method's role requirements.
    Unauthorized,
    /// The handler reported a failure or panicked.
    Invocation { message: String },
    /// No handler is attached for the method, or its coroutine is gone.
    Unavailable { method: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unauthorized => write!(f, "caller is not authorized for this method"),
            DispatchError::Invocation { message } => write!(f, "method invocation failed: {message}"),
            DispatchError::Unavailable { method } => {
                write!(f, "no handler is available for method '{method}'")
            }
        }
    }
}

impl Error for DispatchError {}
