use crate::contract::{MethodDescriptor, ServiceDescriptor};
use http::Method;
use std::sync::Arc;
use tracing::debug;

/// One method's authoritative route, derived once and cached in the table.
///
/// The schema generator reuses this exact value so the API document and the
/// live router can never disagree about a path.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub verb: Method,
    /// Final path template with `{name}` placeholders, always starting
    /// with `/`.
    pub path: String,
    /// Placeholder names in left-to-right path order.
    pub path_param_names: Vec<String>,
    pub method: Arc<MethodDescriptor>,
    pub service: Arc<ServiceDescriptor>,
}

impl ResolvedRoute {
    /// Number of `{name}` wildcard segments; the tiebreaker when two
    /// templates match the same concrete path.
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.path_param_names.len()
    }
}

/// Resolve one method's metadata into its concrete route.
///
/// Pure function: the same descriptor always produces the same route.
/// Precedence:
/// 1. an explicit route template (including the empty string) is used
///    verbatim as the relative route;
/// 2. otherwise the relative route is the display name, falling back to
///    the method name, with every `PathInline` binding appended as a
///    `{property}` segment in ascending sequence order.
///
/// The relative route is then joined onto the service's base path with
/// doubled slashes collapsed. `""` and `"/"` both denote the service root.
#[must_use]
pub fn resolve_route(
    service: &Arc<ServiceDescriptor>,
    method: &Arc<MethodDescriptor>,
) -> ResolvedRoute {
    let mut relative = match &method.route {
        Some(template) => template.clone(),
        None => {
            // Derived routes carry their inline parameters as trailing
            // segments; explicit templates already spell out their own.
            let mut derived = method
                .display_name
                .clone()
                .unwrap_or_else(|| method.name.clone());
            for binding in method.inline_bindings() {
                derived.push_str(&format!("/{{{}}}", binding.name));
            }
            derived
        }
    };

    if let Some(stripped) = relative.strip_prefix('/') {
        relative = stripped.to_string();
    }

    let mut full = format!("{}/{}", service.base_path, relative);
    while full.contains("//") {
        full = full.replace("//", "/");
    }
    if !full.starts_with('/') {
        full.insert(0, '/');
    }
    if full.len() > 1 && full.ends_with('/') {
        full.pop();
    }

    let path_param_names = template_param_names(&full);

    debug!(
        service = %service.name,
        method = %method.name,
        verb = %method.verb,
        path = %full,
        "Route resolved"
    );

    ResolvedRoute {
        verb: method.verb.clone(),
        path: full,
        path_param_names,
        method: Arc::clone(method),
        service: Arc::clone(service),
    }
}

/// Extract `{name}` placeholder names in path order.
fn template_param_names(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2)
        .map(|segment| segment[1..segment.len() - 1].to_string())
        .collect()
}
