//! Route table core - hot path for request matching.

use crate::contract::ServiceDescriptor;
use crate::error::RegistrationError;
use crate::resolver::{resolve_route, ResolvedRoute};
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST routes have four or fewer path parameters.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the static route
/// table; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request to a registered route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<ResolvedRoute>,
    /// Named captures for every `{name}` segment in the template.
    pub path_params: ParamVec,
}

/// One template segment, used for the registration-time overlap check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

struct CompiledRoute {
    verb: Method,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    segments: Vec<Segment>,
    route: Arc<ResolvedRoute>,
}

/// Append-only route table, built once at startup and read-only afterwards.
///
/// `register` walks a service's resolved routes and fails fast on any
/// duplicate or ambiguous (verb, template) pair; `lookup` is `&self` and
/// safe for concurrent use by any number of in-flight requests.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve and insert every route of a service.
    ///
    /// All failures are fatal: the host must refuse to start rather than
    /// serve with an inconsistent table.
    pub fn register(&mut self, service: &Arc<ServiceDescriptor>) -> Result<(), RegistrationError> {
        for method in &service.methods {
            let resolved = resolve_route(service, method);
            self.insert(resolved)?;
        }

        info!(
            service = %service.name,
            base_path = %service.base_path,
            routes_count = self.routes.len(),
            "Routing table loaded"
        );
        Ok(())
    }

    fn insert(&mut self, resolved: ResolvedRoute) -> Result<(), RegistrationError> {
        let segments = parse_template(&resolved.method.name, &resolved.path)?;

        for existing in &self.routes {
            if existing.verb != resolved.verb {
                continue;
            }
            if existing.route.path == resolved.path {
                return Err(RegistrationError::DuplicateRoute {
                    verb: resolved.verb.clone(),
                    path: resolved.path.clone(),
                });
            }
            // Two templates that overlap with the same wildcard count can
            // both win a fewest-wildcards contest; reject at registration.
            if overlaps(&existing.segments, &segments)
                && existing.route.wildcard_count() == resolved.wildcard_count()
            {
                return Err(RegistrationError::AmbiguousRoute {
                    verb: resolved.verb.clone(),
                    first: existing.route.path.clone(),
                    second: resolved.path.clone(),
                });
            }
        }

        let (regex, param_names) = path_to_regex(&resolved.path);
        debug!(
            verb = %resolved.verb,
            path = %resolved.path,
            method = %resolved.method.name,
            "Route registered"
        );
        self.routes.push(CompiledRoute {
            verb: resolved.verb.clone(),
            regex,
            param_names: param_names.into_iter().map(Arc::from).collect(),
            segments,
            route: Arc::new(resolved),
        });
        Ok(())
    }

    /// Match a request to a route and extract its path captures.
    ///
    /// A template matches iff segment counts are equal, literal segments
    /// match exactly, and every `{name}` segment matches a non-empty value.
    /// When several templates match, the one with the fewest wildcard
    /// segments wins; ties were already rejected at registration.
    #[must_use]
    pub fn lookup(&self, verb: &Method, path: &str) -> Option<RouteMatch> {
        debug!(verb = %verb, path = %path, "Route match attempt");

        let best = self
            .routes
            .iter()
            .filter(|r| &r.verb == verb && r.regex.is_match(path))
            .min_by_key(|r| r.route.wildcard_count())?;

        let mut path_params = ParamVec::new();
        if let Some(captures) = best.regex.captures(path) {
            for (idx, name) in best.param_names.iter().enumerate() {
                if let Some(value) = captures.get(idx + 1) {
                    path_params.push((Arc::clone(name), value.as_str().to_string()));
                }
            }
        }

        info!(
            verb = %verb,
            path = %path,
            route_pattern = %best.route.path,
            method = %best.route.method.name,
            path_params = ?path_params,
            "Route matched"
        );

        Some(RouteMatch {
            route: Arc::clone(&best.route),
            path_params,
        })
    }

    /// True when any registered template matches the path, regardless of
    /// verb. Used for OPTIONS preflight answers.
    #[must_use]
    pub fn knows_path(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.regex.is_match(path))
    }

    /// Distinct verbs whose templates match the path, in registration
    /// order. Feeds the `Allow` header of OPTIONS preflight answers.
    #[must_use]
    pub fn allowed_verbs(&self, path: &str) -> Vec<Method> {
        let mut verbs: Vec<Method> = Vec::new();
        for route in self.routes.iter().filter(|r| r.regex.is_match(path)) {
            if !verbs.contains(&route.verb) {
                verbs.push(route.verb.clone());
            }
        }
        verbs
    }

    /// Resolved routes in registration order, for the schema generator and
    /// startup diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedRoute>> {
        self.routes.iter().map(|r| &r.route)
    }
}

/// Convert a path template to an anchored regex plus its parameter names.
///
/// `/customers/{id}` becomes `^/customers/([^/]+)$` with params `["id"]`.
pub(crate) fn path_to_regex(path: &str) -> (Regex, Vec<String>) {
    if path == "/" {
        #[allow(clippy::expect_used)]
        return (
            Regex::new(r"^/$").expect("static root regex"),
            Vec::new(),
        );
    }

    let mut pattern = String::with_capacity(path.len() + 5);
    pattern.push('^');
    let mut param_names = Vec::with_capacity(path.matches('{').count());

    for segment in path.split('/') {
        if segment.starts_with('{') && segment.ends_with('}') {
            param_names.push(segment[1..segment.len() - 1].to_string());
            pattern.push_str("/([^/]+)");
        } else if !segment.is_empty() {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }

    pattern.push('$');
    #[allow(clippy::expect_used)]
    let regex = Regex::new(&pattern).expect("template segments produce a valid regex");

    (regex, param_names)
}

/// Split a resolved template into segments, rejecting malformed
/// placeholders like `/{id`.
fn parse_template(method: &str, path: &str) -> Result<Vec<Segment>, RegistrationError> {
    let mut segments = Vec::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        if raw.starts_with('{') && raw.ends_with('}') && raw.len() > 2 {
            segments.push(Segment::Wildcard);
        } else if raw.contains('{') || raw.contains('}') {
            return Err(RegistrationError::InvalidRouteTemplate {
                method: method.to_string(),
                template: path.to_string(),
            });
        } else {
            segments.push(Segment::Literal(raw.to_string()));
        }
    }
    Ok(segments)
}

/// Two templates overlap when some concrete path satisfies both: equal
/// segment counts and, per position, equal literals or at least one
/// wildcard.
fn overlaps(a: &[Segment], b: &[Segment]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).all(|(x, y)| match (x, y) {
        (Segment::Literal(l), Segment::Literal(r)) => l == r,
        _ => true,
    })
}
