//! # restmap
//!
//! **restmap** is a declarative REST dispatch layer for Rust services on the
//! `may` coroutine runtime. Service contracts are described once (methods,
//! verbs, routes, input and output types, roles) and everything else is
//! derived from that single description: the route table, URL parameter
//! binding, authorization checks, and the OpenAPI document.
//!
//! ## Overview
//!
//! A service is declared with [`contract::ServiceBuilder`]: register the
//! types its methods exchange, declare each method's verb, route, and
//! role requirements, and freeze the result into an immutable
//! [`contract::ServiceDescriptor`]. The host resolves every method to a
//! concrete route template, compiles the templates into a route table, and
//! dispatches matched requests to handler coroutines over channels.
//!
//! ## Architecture
//!
//! - **[`contract`]** - Declarative service/method/type descriptors and the
//!   builders that validate and freeze them
//! - **[`resolver`]** - Route resolution: explicit templates, display-name
//!   and method-name fallbacks, inline path parameters
//! - **[`router`]** - Regex-compiled route table with fewest-wildcards
//!   matching and registration-time ambiguity rejection
//! - **[`binder`]** - URL and body binding into one typed input object
//!   (body seeds, query refines, path wins)
//! - **[`dispatcher`]** - Coroutine-based handler dispatch with role
//!   checks, hooks, and panic recovery
//! - **[`schema`]** - OpenAPI 3.0 document generation from the same
//!   descriptors the router serves
//! - **[`host`]** - Transport-neutral facade tying the pipeline together
//!
//! ## Quick Start
//!
//! ```no_run
//! use restmap::contract::{MethodBuilder, PropertySpec, ServiceBuilder, TargetType, TypeDef};
//! use restmap::host::{HostRequest, RestHost};
//! use restmap::schema::ApiInfo;
//! use http::Method;
//!
//! let service = ServiceBuilder::new("CustomerService", "/api/customers")
//!     .register_type(
//!         TypeDef::object("GetCustomerRequest")
//!             .property(PropertySpec::new("Id", TargetType::String).inline(0)),
//!     )
//!     .register_type(TypeDef::object("GetCustomerResponse"))
//!     .method(
//!         MethodBuilder::new("GetCustomer")
//!             .verb(Method::GET)
//!             .route("{Id}")
//!             .input("GetCustomerRequest")
//!             .output("GetCustomerResponse"),
//!     )
//!     .build()
//!     .expect("valid contract");
//!
//! let mut host = RestHost::new(ApiInfo::new("Customer API", "1.0.0"));
//! host.register_service(&service).expect("unambiguous routes");
//! unsafe {
//!     host.dispatcher_mut().register_method("GetCustomer", |req| {
//!         let id = req.input["Id"].as_str().unwrap_or_default().to_string();
//!         req.reply_json(serde_json::json!({ "id": id }));
//!     });
//! }
//!
//! let response = host.handle(&HostRequest::new(Method::GET, "/api/customers/42"));
//! assert_eq!(response.status, 200);
//! ```
//!
//! ## Runtime Considerations
//!
//! restmap uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Every handler runs in a coroutine fed through an mpsc channel
//! - Stack size is configurable via the `RESTMAP_STACK_SIZE` environment
//!   variable (decimal or `0x`-prefixed hex, default 64KB)
//! - Handler panics are caught and surfaced as 500 responses
//!
//! The host itself is transport-neutral: it consumes a plain
//! [`host::HostRequest`] and produces a [`host::HostResponse`], so any
//! HTTP front end (or a plain test) can drive it.

pub mod binder;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod ids;
pub mod resolver;
pub mod router;
pub mod schema;
pub mod telemetry;

pub use contract::{
    JsonCasing, MethodBuilder, MethodDescriptor, PropertySpec, ServiceBuilder, ServiceDescriptor,
    TargetType, TypeDef, UrlBinding,
};
pub use dispatcher::{
    Dispatcher, FileDownload, HandlerRequest, MethodOutput, Principal, ServiceHooks,
};
pub use host::{HostConfig, HostRequest, HostResponse, RestHost};
pub use ids::RequestId;
pub use schema::ApiInfo;
