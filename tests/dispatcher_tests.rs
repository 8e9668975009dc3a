//! Dispatcher tests driven directly, without the host: handler
//! registration, channel round-trips, panic recovery, hooks, and the
//! declarative role gate.

mod common;

use common::customer_service;
use restmap::contract::MethodDescriptor;
use restmap::dispatcher::{
    Dispatcher, HandlerRequest, MethodOutput, Principal, ServiceHooks,
};
use restmap::error::DispatchError;
use restmap::ids::RequestId;
use restmap::router::ParamVec;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fixture_method(name: &str) -> Arc<MethodDescriptor> {
    let service = customer_service();
    service
        .methods
        .iter()
        .find(|m| m.name == name)
        .map(Arc::clone)
        .expect("fixture method exists")
}

fn dispatch(
    dispatcher: &Dispatcher,
    method: &Arc<MethodDescriptor>,
    input: serde_json::Value,
    principal: Principal,
) -> Result<MethodOutput, DispatchError> {
    dispatcher.dispatch(
        RequestId::new(),
        method,
        "/api/customers/42",
        ParamVec::new(),
        ParamVec::new(),
        input,
        principal,
    )
}

#[test]
fn round_trips_through_the_handler_coroutine() {
    common::setup();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_method("GetCustomer", |req: HandlerRequest| {
            let id = req.input["Id"].as_str().unwrap_or_default().to_string();
            req.reply_json(json!({ "id": id }));
        });
    }

    let method = fixture_method("GetCustomer");
    let output = dispatch(
        &dispatcher,
        &method,
        json!({ "Id": "42" }),
        Principal::anonymous(),
    )
    .unwrap();
    assert_eq!(output, MethodOutput::Json(json!({ "id": "42" })));
}

#[test]
fn unregistered_methods_are_unavailable() {
    common::setup();
    let dispatcher = Dispatcher::new();
    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert!(matches!(err, DispatchError::Unavailable { .. }));
}

#[test]
fn panics_surface_as_invocation_failures() {
    common::setup();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_method("GetCustomer", |_req: HandlerRequest| {
            panic!("boom");
        });
    }

    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    match err {
        DispatchError::Invocation { message } => assert!(message.contains("panicked")),
        other => panic!("expected Invocation, got {other:?}"),
    }
}

#[test]
fn handler_errors_carry_their_message() {
    common::setup();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_method("GetCustomer", |req: HandlerRequest| {
            req.reply_error("record not found");
        });
    }

    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::Invocation {
            message: "record not found".into()
        }
    );
}

#[test]
fn anyhow_results_unwrap_to_the_root_cause() {
    common::setup();
    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_method("GetCustomer", |req: HandlerRequest| {
            let inner = anyhow::anyhow!("connection refused");
            req.reply_result(Err(inner.context("loading customer")));
        });
    }

    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::Invocation {
            message: "connection refused".into()
        }
    );
}

#[test]
fn role_gate_runs_before_the_handler() {
    common::setup();
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);

    let mut dispatcher = Dispatcher::new();
    unsafe {
        dispatcher.register_method("SaveCustomer", move |req: HandlerRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            req.reply_json(json!({}));
        });
    }

    let method = fixture_method("SaveCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert_eq!(err, DispatchError::Unauthorized);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    let admin = Principal::authenticated("admin", &["Administrators"]);
    dispatch(&dispatcher, &method, json!({}), admin).unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

struct CountingHooks {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl ServiceHooks for CountingHooks {
    fn before(&self, _request: &HandlerRequest) {
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn after(&self, _request: &HandlerRequest, _output: &mut MethodOutput, _latency: Duration) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

struct VetoHooks;

impl ServiceHooks for VetoHooks {
    fn authorize(&self, _request: &HandlerRequest) -> Result<(), DispatchError> {
        Err(DispatchError::Unauthorized)
    }
}

#[test]
fn hooks_wrap_successful_invocations() {
    common::setup();
    let hooks = Arc::new(CountingHooks {
        before: AtomicUsize::new(0),
        after: AtomicUsize::new(0),
    });

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_hooks(Arc::clone(&hooks) as Arc<dyn ServiceHooks>);
    unsafe {
        dispatcher.register_method("GetCustomer", |req: HandlerRequest| {
            req.reply_json(json!({}));
        });
    }

    let method = fixture_method("GetCustomer");
    dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap();
    assert_eq!(hooks.before.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.after.load(Ordering::SeqCst), 1);
}

#[test]
fn after_hooks_are_skipped_on_failure() {
    common::setup();
    let hooks = Arc::new(CountingHooks {
        before: AtomicUsize::new(0),
        after: AtomicUsize::new(0),
    });

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_hooks(Arc::clone(&hooks) as Arc<dyn ServiceHooks>);
    unsafe {
        dispatcher.register_method("GetCustomer", |req: HandlerRequest| {
            req.reply_error("nope");
        });
    }

    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert!(matches!(err, DispatchError::Invocation { .. }));
    assert_eq!(hooks.before.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.after.load(Ordering::SeqCst), 0);
}

#[test]
fn authorize_hooks_can_veto_open_methods() {
    common::setup();
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_hooks(Arc::new(VetoHooks));
    unsafe {
        dispatcher.register_method("GetCustomer", move |req: HandlerRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            req.reply_json(json!({}));
        });
    }

    let method = fixture_method("GetCustomer");
    let err = dispatch(&dispatcher, &method, json!({}), Principal::anonymous()).unwrap_err();
    assert_eq!(err, DispatchError::Unauthorized);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}
