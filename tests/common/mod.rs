//! Shared fixtures: a customer service contract exercising every binding
//! mode, and a fully wired host with in-memory handlers.

#![allow(dead_code)]

use restmap::contract::{
    MethodBuilder, PropertySpec, ServiceBuilder, ServiceDescriptor, TargetType, TypeDef,
};
use restmap::dispatcher::FileDownload;
use restmap::host::{HostConfig, RestHost};
use restmap::schema::ApiInfo;
use http::Method;
use serde_json::json;
use std::sync::Arc;

/// Configure the coroutine stack size and a test tracing subscriber.
/// Safe to call from every test; later calls are no-ops.
pub fn setup() {
    let size = std::env::var("RESTMAP_STACK_SIZE")
        .ok()
        .and_then(|v| {
            if let Some(hex) = v.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).ok()
            } else {
                v.parse().ok()
            }
        })
        .unwrap_or(0x4000);
    may::config().set_stack_size(size);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn api_info() -> ApiInfo {
    ApiInfo::new("Customer API", "1.0.0").description("Test fixture service")
}

/// One service covering explicit routes, derived routes, inline path
/// parameters, named query parameters, role restrictions, and a file
/// method.
pub fn customer_service() -> Arc<ServiceDescriptor> {
    ServiceBuilder::new("CustomerService", "/api/customers")
        .description("Customer lookup and maintenance")
        .register_type(
            TypeDef::object("GetCustomerRequest")
                .property(PropertySpec::new("Id", TargetType::String).inline(0)),
        )
        .register_type(
            TypeDef::object("CustomerResponse")
                .property(PropertySpec::new("Id", TargetType::String))
                .property(PropertySpec::new("FullName", TargetType::String).required()),
        )
        .register_type(
            TypeDef::object("SearchRequest")
                .property(PropertySpec::new("SearchText", TargetType::String).named())
                .property(PropertySpec::new("IncludeInactive", TargetType::Bool).named()),
        )
        .register_type(
            TypeDef::object("SearchResponse").property(PropertySpec::new(
                "Matches",
                TargetType::List(Box::new(TargetType::Object("CustomerResponse".into()))),
            )),
        )
        .register_type(
            TypeDef::object("SaveCustomerRequest")
                .property(PropertySpec::new("Id", TargetType::String))
                .property(PropertySpec::new("FullName", TargetType::String).required()),
        )
        .register_type(
            TypeDef::object("StatementRequest")
                .property(PropertySpec::new("Id", TargetType::String).inline(0)),
        )
        .method(
            MethodBuilder::new("GetCustomer")
                .verb(Method::GET)
                .route("{Id}")
                .input("GetCustomerRequest")
                .output("CustomerResponse")
                .summary("Fetch one customer by id"),
        )
        .method(
            MethodBuilder::new("Search")
                .verb(Method::GET)
                .input("SearchRequest")
                .output("SearchResponse"),
        )
        .method(
            MethodBuilder::new("SaveCustomer")
                .route("")
                .roles("Administrators")
                .input("SaveCustomerRequest")
                .output("CustomerResponse"),
        )
        .method(
            MethodBuilder::new("GetStatement")
                .verb(Method::GET)
                .route("{Id}/statement")
                .input("StatementRequest"),
        )
        .method(MethodBuilder::new("Fail").route("fail").output("CustomerResponse"))
        .method(MethodBuilder::new("Explode").route("explode").output("CustomerResponse"))
        .build()
        .expect("fixture contract is valid")
}

/// Host with the customer service registered and handlers attached.
pub fn customer_host(config: HostConfig) -> RestHost {
    setup();
    let service = customer_service();
    let mut host = RestHost::with_config(api_info(), config);
    host.register_service(&service).expect("routes register");

    let dispatcher = host.dispatcher_mut();
    unsafe {
        dispatcher.register_method("GetCustomer", |req| {
            let id = req.input["Id"].as_str().unwrap_or_default().to_string();
            req.reply_json(json!({ "id": id, "fullName": "Jane Smith" }));
        });
        dispatcher.register_method("Search", |req| {
            req.reply_json(json!({
                "searchText": req.input.get("SearchText").cloned().unwrap_or_default(),
                "includeInactive": req.input.get("IncludeInactive").cloned().unwrap_or_default(),
            }));
        });
        dispatcher.register_method("SaveCustomer", |req| {
            let mut echoed = req.input.clone();
            if let Some(obj) = echoed.as_object_mut() {
                obj.insert("saved".into(), json!(true));
            }
            req.reply_json(echoed);
        });
        dispatcher.register_method("GetStatement", |req| {
            let id = req.input["Id"].as_str().unwrap_or_default();
            req.reply_file(FileDownload {
                file_name: format!("statement-{id}.pdf"),
                content_type: "application/pdf".to_string(),
                bytes: vec![0x25, 0x50, 0x44, 0x46],
            });
        });
        dispatcher.register_method("Fail", |req| {
            req.reply_error("database offline");
        });
        dispatcher.register_method("Explode", |_req| {
            panic!("boom");
        });
    }
    host
}
