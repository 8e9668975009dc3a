use crate::contract::MethodDescriptor;
use crate::error::DispatchError;
use crate::ids::RequestId;
use crate::router::ParamVec;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Caller identity attached to every dispatched request.
///
/// The transport layer decides how a principal is established (session,
/// token, mTLS); the dispatcher only consumes the result.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    /// Whether the caller presented valid credentials at all.
    pub authenticated: bool,
    /// Display name of the caller, if known.
    pub name: Option<String>,
    /// Roles granted to the caller.
    pub roles: Vec<String>,
}

impl Principal {
    /// An unauthenticated caller with no roles.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller carrying the given roles.
    #[must_use]
    pub fn authenticated(name: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            authenticated: true,
            name: Some(name.into()),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    fn has_any_role(&self, required: &[String]) -> bool {
        required
            .iter()
            .any(|need| self.roles.iter().any(|have| have.eq_ignore_ascii_case(need)))
    }
}

/// Raw file payload returned by a method instead of a JSON document.
///
/// The host streams the bytes through untouched with the declared content
/// type and an `inline` disposition carrying the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDownload {
    pub file_name: String,
    pub content_type: String,
    /// Raw payload, streamed through untouched.
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,
}

/// What a method produced: a JSON document or a raw file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MethodOutput {
    Json(Value),
    File(FileDownload),
}

/// What a handler coroutine sends back on the reply channel.
pub type HandlerResult = Result<MethodOutput, String>;

/// Request data passed to a handler coroutine.
///
/// The input object has already been bound and typed by the time it gets
/// here; handlers see one JSON document, never the raw transport pieces.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP verb the request arrived on
    pub verb: Method,
    /// Request path as matched
    pub path: String,
    /// Contract method being invoked
    pub method_name: String,
    /// Path captures (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Query-string values (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// Fully bound input object
    pub input: Value,
    /// Caller identity, post role check
    pub principal: Principal,
    /// Channel for sending the result back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResult>,
}

impl HandlerRequest {
    /// Get a path capture by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query value by name. Last write wins for repeated keys.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Send a successful JSON result back to the dispatcher.
    pub fn reply_json(&self, body: Value) {
        let _ = self.reply_tx.send(Ok(MethodOutput::Json(body)));
    }

    /// Send a file result back to the dispatcher.
    pub fn reply_file(&self, file: FileDownload) {
        let _ = self.reply_tx.send(Ok(MethodOutput::File(file)));
    }

    /// Report a failure; the message becomes the failure information of
    /// the response envelope.
    pub fn reply_error(&self, message: impl Into<String>) {
        let _ = self.reply_tx.send(Err(message.into()));
    }

    /// Send an `anyhow` result, unwrapping to the root cause so the
    /// envelope carries the innermost failure rather than the context
    /// chain.
    pub fn reply_result(&self, result: anyhow::Result<Value>) {
        match result {
            Ok(body) => self.reply_json(body),
            Err(e) => self.reply_error(e.root_cause().to_string()),
        }
    }
}

/// Type alias for a channel sender that feeds a handler coroutine.
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Interception points around method invocation.
///
/// `authorize` runs after the declarative role check and may veto the
/// request; `before` and `after` observe it. All three default to no-ops
/// so implementors override only what they need.
pub trait ServiceHooks: Send + Sync {
    fn authorize(&self, _request: &HandlerRequest) -> Result<(), DispatchError> {
        Ok(())
    }

    fn before(&self, _request: &HandlerRequest) {}

    fn after(&self, _request: &HandlerRequest, _output: &mut MethodOutput, _latency: Duration) {}
}

/// Routes dispatch-ready requests to registered handler coroutines.
///
/// Each contract method maps to one long-lived coroutine fed through a
/// channel; a reply channel per request carries the result back. Hooks
/// wrap every invocation in registration order.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, HandlerSender>,
    hooks: Vec<Arc<dyn ServiceHooks>>,
}

impl Dispatcher {
    /// Create an empty dispatcher. Handlers are attached with
    /// [`register_method`](Self::register_method).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a handler is attached for the given method name.
    #[must_use]
    pub fn has_handler(&self, method_name: &str) -> bool {
        self.handlers.contains_key(method_name)
    }

    /// Add a hook to the invocation pipeline. Hooks run in the order
    /// they were added.
    pub fn add_hooks(&mut self, hooks: Arc<dyn ServiceHooks>) {
        self.hooks.push(hooks);
    }

    /// Register the handler coroutine for a contract method.
    ///
    /// Spawns a coroutine that drains the method's request channel. The
    /// handler body is wrapped in panic recovery so one failing method
    /// cannot take the process down; a panic surfaces as an invocation
    /// failure on the reply channel.
    ///
    /// Replacing an existing handler drops the old sender, which closes
    /// its channel and lets the old coroutine exit.
    ///
    /// # Safety
    ///
    /// `may::coroutine::Builder::spawn()` is unsafe in the `may` runtime;
    /// the unsafety comes from the coroutine runtime's requirements, not
    /// from this function's logic. The caller must ensure the may runtime
    /// is initialized and that the handler sends exactly one result per
    /// request.
    pub unsafe fn register_method<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static + Clone,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let coroutine_name = name.clone();

        if let Some(old_sender) = self.handlers.remove(&name) {
            drop(old_sender);
            warn!(
                method_name = %name,
                "Replaced existing handler - old coroutine will exit"
            );
        }

        let stack_size = handler_stack_size();

        // SAFETY: spawn is only called during initialization, the handler
        // is Send + 'static, and failures travel on the reply channel
        // rather than unwinding across the coroutine boundary.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(
                        method_name = %coroutine_name,
                        stack_size = stack_size,
                        "Handler coroutine start"
                    );

                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let method_name = req.method_name.clone();
                        let request_id = req.request_id;

                        let start = Instant::now();
                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            let panic_message = format!("{panic:?}");
                            error!(
                                request_id = %request_id,
                                method_name = %method_name,
                                panic_message = %panic_message,
                                "Handler panicked - CRITICAL"
                            );
                            let _ = reply_tx
                                .send(Err(format!("Handler panicked: {panic_message}")));
                        } else {
                            debug!(
                                request_id = %request_id,
                                method_name = %method_name,
                                execution_time_ms = start.elapsed().as_millis() as u64,
                                "Handler execution complete"
                            );
                        }
                    }
                })
        };

        if let Err(e) = spawn_result {
            error!(
                method_name = %name,
                error = %e,
                stack_size = stack_size,
                "Failed to spawn handler coroutine - CRITICAL"
            );
            return;
        }

        self.handlers.insert(name, tx);
    }

    /// Dispatch one bound request to its handler and wait for the result.
    ///
    /// Walks the fixed invocation sequence: declarative role check, hook
    /// authorization, before hooks, handler invocation, after hooks. Any
    /// failure short-circuits the remainder and is returned to the caller
    /// as the terminal state.
    pub fn dispatch(
        &self,
        request_id: RequestId,
        method: &Arc<MethodDescriptor>,
        path: &str,
        path_params: ParamVec,
        query_params: ParamVec,
        input: Value,
        principal: Principal,
    ) -> Result<MethodOutput, DispatchError> {
        debug!(
            request_id = %request_id,
            method_name = %method.name,
            is_async = method.is_async,
            state = "Received",
            "Dispatch begin"
        );
        if method.deprecated {
            warn!(
                request_id = %request_id,
                method_name = %method.name,
                reason = method.deprecation_reason.as_deref().unwrap_or(""),
                "Deprecated method invoked"
            );
        }

        check_roles(method, &principal)?;
        debug!(
            request_id = %request_id,
            method_name = %method.name,
            state = "AuthorizationChecked",
            "Role check passed"
        );

        let tx = self
            .handlers
            .get(&method.name)
            .ok_or_else(|| {
                error!(
                    request_id = %request_id,
                    method_name = %method.name,
                    available_handlers = self.handlers.len(),
                    "Handler not found - CRITICAL"
                );
                DispatchError::Unavailable {
                    method: method.name.clone(),
                }
            })?;

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = HandlerRequest {
            request_id,
            verb: method.verb.clone(),
            path: path.to_string(),
            method_name: method.name.clone(),
            path_params,
            query_params,
            input,
            principal,
            reply_tx,
        };

        for hooks in &self.hooks {
            hooks.authorize(&request)?;
        }
        for hooks in &self.hooks {
            hooks.before(&request);
        }
        debug!(
            request_id = %request_id,
            method_name = %method.name,
            state = "BeforeHook",
            hook_count = self.hooks.len(),
            "Hooks ran"
        );

        let start = Instant::now();
        if let Err(e) = tx.send(request.clone()) {
            error!(
                request_id = %request_id,
                method_name = %method.name,
                error = %e,
                "Failed to send request to handler"
            );
            return Err(DispatchError::Unavailable {
                method: method.name.clone(),
            });
        }

        let result = match reply_rx.recv() {
            Ok(result) => result,
            Err(e) => {
                error!(
                    request_id = %request_id,
                    method_name = %method.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Handler channel closed - handler may have crashed"
                );
                return Err(DispatchError::Unavailable {
                    method: method.name.clone(),
                });
            }
        };
        let latency = start.elapsed();
        info!(
            request_id = %request_id,
            method_name = %method.name,
            state = "Invoked",
            latency_ms = latency.as_millis() as u64,
            success = result.is_ok(),
            "Handler result received"
        );

        let mut output = result.map_err(|message| DispatchError::Invocation { message })?;

        for hooks in &self.hooks {
            hooks.after(&request, &mut output, latency);
        }
        debug!(
            request_id = %request_id,
            method_name = %method.name,
            state = "ResponseReady",
            "Dispatch complete"
        );

        Ok(output)
    }
}

/// Declarative role gate for a method.
///
/// No role list means the method is open. An empty list means any
/// authenticated caller. A non-empty list requires at least one matching
/// role (case-insensitive).
pub fn check_roles(method: &MethodDescriptor, principal: &Principal) -> Result<(), DispatchError> {
    let Some(required) = &method.roles else {
        return Ok(());
    };
    if !principal.authenticated {
        return Err(DispatchError::Unauthorized);
    }
    if required.is_empty() || principal.has_any_role(required) {
        Ok(())
    } else {
        Err(DispatchError::Unauthorized)
    }
}

/// Coroutine stack size, overridable via `RESTMAP_STACK_SIZE` (decimal or
/// `0x`-prefixed hex). Defaults to 64KB.
fn handler_stack_size() -> usize {
    std::env::var("RESTMAP_STACK_SIZE")
        .ok()
        .and_then(|s| {
            if let Some(hex) = s.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).ok()
            } else {
                s.parse().ok()
            }
        })
        .unwrap_or(0x10000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MethodBuilder, ServiceBuilder, TypeDef};

    fn method_with_roles(roles: Option<&str>) -> Arc<MethodDescriptor> {
        let mut builder = MethodBuilder::new("GetCustomer").output("CustomerResponse");
        if let Some(r) = roles {
            builder = builder.roles(r);
        }
        let svc = ServiceBuilder::new("CustomerService", "/api/customers")
            .register_type(TypeDef::object("CustomerResponse"))
            .method(builder)
            .build()
            .unwrap();
        Arc::clone(&svc.methods[0])
    }

    #[test]
    fn open_methods_admit_anonymous_callers() {
        let method = method_with_roles(None);
        assert!(check_roles(&method, &Principal::anonymous()).is_ok());
    }

    #[test]
    fn empty_role_list_requires_authentication_only() {
        let method = method_with_roles(Some(""));
        assert!(check_roles(&method, &Principal::anonymous()).is_err());
        assert!(check_roles(&method, &Principal::authenticated("kim", &[])).is_ok());
    }

    #[test]
    fn named_roles_require_an_intersection() {
        let method = method_with_roles(Some("Administrators, Support"));
        let guest = Principal::authenticated("guest", &["Guests"]);
        assert!(matches!(
            check_roles(&method, &guest),
            Err(DispatchError::Unauthorized)
        ));
        let admin = Principal::authenticated("admin", &["administrators"]);
        assert!(check_roles(&method, &admin).is_ok());
    }
}
