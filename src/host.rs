//! Transport-neutral request front door.
//!
//! [`RestHost`] owns the registered services, the route table, and the
//! dispatcher, and turns one inbound request into one outbound response:
//! match, transport-security gate, bind, dispatch, envelope. It speaks a
//! minimal request/response shape so any HTTP server (or a test) can drive
//! it without the host knowing which one.

use crate::binder::bind_input;
use crate::contract::{JsonCasing, ServiceDescriptor};
use crate::dispatcher::{Dispatcher, MethodOutput, Principal};
use crate::error::{DispatchError, RegistrationError};
use crate::ids::RequestId;
use crate::router::{ParamVec, RouteTable};
use crate::schema::{build_document, ApiInfo};
use http::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Host-level behavior switches.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Include handler failure detail in error envelopes. Off by default;
    /// production responses carry a generic message and the detail stays
    /// in the logs.
    pub expose_exception_details: bool,
}

/// One inbound request, already stripped of transport specifics.
#[derive(Debug, Clone)]
pub struct HostRequest {
    pub verb: Method,
    /// Decoded request path, no query string.
    pub path: String,
    /// Raw query string without the leading `?`, if any.
    pub query: Option<String>,
    pub body: Vec<u8>,
    /// Whether the request arrived over a secure transport.
    pub secure: bool,
    pub principal: Principal,
}

impl HostRequest {
    pub fn new(verb: Method, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            query: None,
            body: Vec::new(),
            secure: true,
            principal: Principal::anonymous(),
        }
    }

    #[must_use]
    pub fn query(mut self, raw: impl Into<String>) -> Self {
        self.query = Some(raw.into());
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = bytes.into();
        self
    }

    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }
}

/// One outbound response, ready for any transport to serialize.
#[derive(Debug, Clone)]
pub struct HostResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HostResponse {
    fn json(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    /// Parse the body as JSON. Test and diagnostics convenience.
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// The assembled service host: route table, dispatcher, and descriptors.
///
/// Services are registered once at startup; registration failures are
/// fatal and leave the host unstarted. After that, `handle` is `&self`
/// and safe to call from any number of server coroutines.
pub struct RestHost {
    info: ApiInfo,
    config: HostConfig,
    table: RouteTable,
    dispatcher: Dispatcher,
    services: Vec<Arc<ServiceDescriptor>>,
}

impl RestHost {
    #[must_use]
    pub fn new(info: ApiInfo) -> Self {
        Self::with_config(info, HostConfig::default())
    }

    #[must_use]
    pub fn with_config(info: ApiInfo, config: HostConfig) -> Self {
        Self {
            info,
            config,
            table: RouteTable::new(),
            dispatcher: Dispatcher::new(),
            services: Vec::new(),
        }
    }

    /// Register a service contract: resolve its routes into the table and
    /// remember it for schema generation.
    pub fn register_service(
        &mut self,
        service: &Arc<ServiceDescriptor>,
    ) -> Result<(), RegistrationError> {
        self.table.register(service)?;
        self.services.push(Arc::clone(service));
        Ok(())
    }

    /// Mutable access to the dispatcher for attaching method handlers and
    /// hooks during startup.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// Generate the OpenAPI document for everything this host serves.
    pub fn api_document(&self) -> Result<Value, RegistrationError> {
        build_document(&self.info, &self.services)
    }

    /// Process one request end to end.
    pub fn handle(&self, request: &HostRequest) -> HostResponse {
        let request_id = RequestId::new();
        info!(
            request_id = %request_id,
            verb = %request.verb,
            path = %request.path,
            "Request received"
        );

        if request.verb == Method::OPTIONS {
            return self.preflight(&request.path);
        }

        let Some(found) = self.table.lookup(&request.verb, &request.path) else {
            warn!(
                request_id = %request_id,
                verb = %request.verb,
                path = %request.path,
                "No route matched"
            );
            // No service context yet, so the envelope uses the default
            // casing policy.
            return failure(
                404,
                JsonCasing::default(),
                &format!("No service method matches {} {}", request.verb, request.path),
            );
        };
        let route = found.route;
        let service = &route.service;
        let method = &route.method;
        let casing = service.casing;

        if service.require_secure && !request.secure {
            warn!(
                request_id = %request_id,
                service = %service.name,
                "Insecure request to a secure-only service"
            );
            return failure(
                403,
                casing,
                "This service requires a secure transport connection",
            );
        }

        let query_params = request
            .query
            .as_deref()
            .map(parse_query)
            .unwrap_or_default();

        let input = match bind_input(
            method,
            &service.types,
            &found.path_params,
            &query_params,
            &request.body,
        ) {
            Ok(input) => input,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method_name = %method.name,
                    error = %e,
                    "Input binding failed"
                );
                return failure(400, casing, &e.to_string());
            }
        };

        let output = self.dispatcher.dispatch(
            request_id,
            method,
            &request.path,
            found.path_params,
            query_params,
            input,
            request.principal.clone(),
        );

        match output {
            Ok(MethodOutput::Json(value)) => {
                let content_type = method
                    .content_type
                    .as_deref()
                    .unwrap_or("application/json");
                let body = serde_json::to_vec(&value).unwrap_or_default();
                HostResponse::json(200, content_type, body)
            }
            Ok(MethodOutput::File(file)) => {
                let mut response = HostResponse::json(200, &file.content_type, file.bytes);
                response.headers.push((
                    "Content-Disposition".to_string(),
                    format!("inline; filename={}", file.file_name),
                ));
                response
            }
            Err(DispatchError::Unauthorized) => {
                failure(401, casing, "The caller is not authorized for this method")
            }
            Err(DispatchError::Unavailable { method }) => failure(
                503,
                casing,
                &format!("The method '{method}' is not available"),
            ),
            Err(DispatchError::Invocation { message }) => {
                let detail = if self.config.expose_exception_details {
                    message.as_str()
                } else {
                    "The service failed to process the request"
                };
                failure(500, casing, detail)
            }
        }
    }

    /// Answer an OPTIONS preflight: 204 with the verbs the path supports,
    /// 404 when no template matches at all.
    fn preflight(&self, path: &str) -> HostResponse {
        let verbs = self.table.allowed_verbs(path);
        if verbs.is_empty() {
            return failure(
                404,
                JsonCasing::default(),
                &format!("No service method matches {path}"),
            );
        }
        let allow = verbs
            .iter()
            .map(http::Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        HostResponse {
            status: 204,
            content_type: String::new(),
            headers: vec![("Allow".to_string(), allow)],
            body: Vec::new(),
        }
    }
}

/// Build a failure envelope response with the service's casing policy.
fn failure(status: u16, casing: JsonCasing, message: &str) -> HostResponse {
    let mut envelope = Map::new();
    envelope.insert(casing.apply("Success"), json!(false));
    envelope.insert(casing.apply("FailureInformation"), json!(message));
    let body = serde_json::to_vec(&Value::Object(envelope)).unwrap_or_default();
    HostResponse::json(status, "application/json", body)
}

/// Split and percent-decode a raw query string into key/value pairs.
/// Undecodable pairs keep their raw spelling rather than failing the
/// request.
fn parse_query(raw: &str) -> ParamVec {
    let mut params = ParamVec::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(value)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.push((Arc::from(key.as_str()), value));
    }
    params
}
