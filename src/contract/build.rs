//! Builder registration pass producing the descriptor graph.
//!
//! The original model read declarative annotations off contract methods at
//! runtime. Here the same metadata is declared upfront through builders,
//! validated once, and frozen into [`ServiceDescriptor`]s before the route
//! table is constructed.

use super::types::{
    BindingMode, JsonCasing, MethodDescriptor, ParameterBinding, ServiceDescriptor, TargetType,
    TypeDef, TypeRegistry, UrlBinding,
};
use crate::error::RegistrationError;
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Builder for one contract method's declarative metadata.
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    verb: Method,
    route: Option<String>,
    display_name: Option<String>,
    roles: Option<String>,
    content_type: Option<String>,
    deprecated: bool,
    deprecation_reason: Option<String>,
    is_async: bool,
    summary: String,
    description: String,
    inputs: Vec<String>,
    output_type: String,
}

impl MethodBuilder {
    /// Start a method descriptor. The verb defaults to POST when no verb
    /// is declared, matching the original contract model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verb: Method::POST,
            route: None,
            display_name: None,
            roles: None,
            content_type: None,
            deprecated: false,
            deprecation_reason: None,
            is_async: false,
            summary: String::new(),
            description: String::new(),
            inputs: Vec::new(),
            output_type: String::new(),
        }
    }

    #[must_use]
    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = verb;
        self
    }

    /// Declare an explicit route template. The empty string is a valid,
    /// meaningful root route, distinct from leaving the route unset.
    #[must_use]
    pub fn route(mut self, template: impl Into<String>) -> Self {
        self.route = Some(template.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Comma-separated role list. An empty string means "any authenticated
    /// user, no specific role".
    #[must_use]
    pub fn roles(mut self, roles: impl Into<String>) -> Self {
        self.roles = Some(roles.into());
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }

    /// Flag the target method as asynchronous. Dispatch awaits completion
    /// either way; the flag feeds tracing only.
    #[must_use]
    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    #[must_use]
    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = text.into();
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Declare the method's single input type. Calling this more than once
    /// is rejected at build time with `TooManyParameters`.
    #[must_use]
    pub fn input(mut self, type_name: impl Into<String>) -> Self {
        self.inputs.push(type_name.into());
        self
    }

    #[must_use]
    pub fn output(mut self, type_name: impl Into<String>) -> Self {
        self.output_type = type_name.into();
        self
    }
}

/// Builder for one hosted service contract.
pub struct ServiceBuilder {
    name: String,
    base_path: String,
    casing: JsonCasing,
    require_secure: bool,
    description: String,
    methods: Vec<MethodBuilder>,
    types: TypeRegistry,
}

impl ServiceBuilder {
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            casing: JsonCasing::default(),
            require_secure: false,
            description: String::new(),
            methods: Vec::new(),
            types: TypeRegistry::new(),
        }
    }

    #[must_use]
    pub fn casing(mut self, casing: JsonCasing) -> Self {
        self.casing = casing;
        self
    }

    #[must_use]
    pub fn require_secure(mut self) -> Self {
        self.require_secure = true;
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Register a type so methods can reference it by name.
    #[must_use]
    pub fn register_type(mut self, def: TypeDef) -> Self {
        self.types.insert(def);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Validate and freeze the descriptor graph.
    ///
    /// All failures here are fatal: a contract that does not validate must
    /// never reach the route table.
    pub fn build(self) -> Result<Arc<ServiceDescriptor>, RegistrationError> {
        let mut methods = Vec::with_capacity(self.methods.len());

        for m in self.methods {
            if m.inputs.len() > 1 {
                return Err(RegistrationError::TooManyParameters { method: m.name });
            }
            let input_type = m.inputs.into_iter().next();

            if let Some(type_name) = &input_type {
                verify_type(&m.name, type_name, &self.types)?;
            }
            if !m.output_type.is_empty() {
                verify_type(&m.name, &m.output_type, &self.types)?;
            }

            let bindings = match &input_type {
                Some(type_name) => derive_bindings(&m.name, type_name, &self.types)?,
                None => Vec::new(),
            };

            debug!(
                service = %self.name,
                method = %m.name,
                verb = %m.verb,
                bindings = bindings.len(),
                "Method descriptor built"
            );

            methods.push(Arc::new(MethodDescriptor {
                name: m.name,
                verb: m.verb,
                route: m.route,
                display_name: m.display_name,
                roles: m.roles.as_deref().map(parse_roles),
                content_type: m.content_type,
                deprecated: m.deprecated,
                deprecation_reason: m.deprecation_reason,
                is_async: m.is_async,
                summary: m.summary,
                description: m.description,
                input_type,
                output_type: m.output_type,
                bindings,
            }));
        }

        Ok(Arc::new(ServiceDescriptor {
            name: self.name,
            base_path: self.base_path,
            casing: self.casing,
            require_secure: self.require_secure,
            description: self.description,
            methods,
            types: self.types,
        }))
    }
}

/// Normalize a comma-separated role attribute into a role set.
/// Empty entries are removed; an attribute that is present but empty after
/// the split means "any authenticated user".
fn parse_roles(roles: &str) -> Vec<String> {
    roles
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Enumerate the input type's properties in declaration order and resolve
/// each into a parameter binding. Inline sequence numbers must be distinct
/// within one method.
fn derive_bindings(
    method: &str,
    type_name: &str,
    types: &TypeRegistry,
) -> Result<Vec<ParameterBinding>, RegistrationError> {
    let def = types
        .get(type_name)
        .ok_or_else(|| RegistrationError::UnknownType {
            method: method.to_string(),
            type_name: type_name.to_string(),
        })?;

    let mut seen_sequences = HashSet::new();
    let mut bindings = Vec::with_capacity(def.properties.len());
    for prop in &def.properties {
        let mode = match prop.binding {
            Some(UrlBinding::Inline { sequence }) => {
                if !seen_sequences.insert(sequence) {
                    return Err(RegistrationError::DuplicateSequence {
                        method: method.to_string(),
                        property: prop.name.clone(),
                        sequence,
                    });
                }
                BindingMode::PathInline { sequence }
            }
            Some(UrlBinding::Named) => BindingMode::QueryNamed,
            None => BindingMode::Body,
        };
        bindings.push(ParameterBinding {
            name: prop.name.clone(),
            target: prop.target.clone(),
            mode,
            required: prop.required || matches!(mode, BindingMode::PathInline { .. }),
        });
    }
    Ok(bindings)
}

/// Check that a type and every object type reachable from it is registered.
fn verify_type(
    method: &str,
    type_name: &str,
    types: &TypeRegistry,
) -> Result<(), RegistrationError> {
    let mut pending = vec![type_name.to_string()];
    let mut visited = HashSet::new();

    while let Some(name) = pending.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let def = types
            .get(&name)
            .ok_or_else(|| RegistrationError::UnknownType {
                method: method.to_string(),
                type_name: name.clone(),
            })?;
        for prop in &def.properties {
            collect_object_refs(&prop.target, &mut pending);
        }
    }
    Ok(())
}

fn collect_object_refs(target: &TargetType, out: &mut Vec<String>) {
    match target {
        TargetType::Object(name) => out.push(name.clone()),
        TargetType::Nullable(inner) | TargetType::List(inner) => collect_object_refs(inner, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::types::PropertySpec;

    fn minimal_types() -> Vec<TypeDef> {
        vec![
            TypeDef::object("In").property(PropertySpec::new("Id", TargetType::String).inline(0)),
            TypeDef::object("Out"),
        ]
    }

    #[test]
    fn rejects_second_input_parameter() {
        let mut builder = ServiceBuilder::new("Svc", "/api/svc");
        for def in minimal_types() {
            builder = builder.register_type(def);
        }
        let err = builder
            .method(MethodBuilder::new("Broken").input("In").input("In").output("Out"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::TooManyParameters {
                method: "Broken".into()
            }
        );
    }

    #[test]
    fn rejects_unregistered_input_type() {
        let err = ServiceBuilder::new("Svc", "/api/svc")
            .register_type(TypeDef::object("Out"))
            .method(MethodBuilder::new("Get").input("Missing").output("Out"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownType { .. }));
    }

    #[test]
    fn rejects_nested_unregistered_type() {
        let err = ServiceBuilder::new("Svc", "/api/svc")
            .register_type(
                TypeDef::object("Out").property(PropertySpec::new(
                    "Child",
                    TargetType::Object("Missing".into()),
                )),
            )
            .method(MethodBuilder::new("Get").output("Out"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownType { .. }));
    }

    #[test]
    fn rejects_duplicate_inline_sequences() {
        let err = ServiceBuilder::new("Svc", "/api/svc")
            .register_type(
                TypeDef::object("In")
                    .property(PropertySpec::new("A", TargetType::String).inline(1))
                    .property(PropertySpec::new("B", TargetType::String).inline(1)),
            )
            .register_type(TypeDef::object("Out"))
            .method(MethodBuilder::new("Get").input("In").output("Out"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateSequence { .. }));
    }

    #[test]
    fn role_attribute_normalizes_to_set() {
        let svc = ServiceBuilder::new("Svc", "/api/svc")
            .register_type(TypeDef::object("Out"))
            .method(MethodBuilder::new("A").roles("Administrators, Operators").output("Out"))
            .method(MethodBuilder::new("B").roles("").output("Out"))
            .method(MethodBuilder::new("C").output("Out"))
            .build()
            .unwrap();
        assert_eq!(
            svc.methods[0].roles,
            Some(vec!["Administrators".to_string(), "Operators".to_string()])
        );
        // Present-but-empty means "any authenticated user".
        assert_eq!(svc.methods[1].roles, Some(vec![]));
        // Absent means "no restriction".
        assert_eq!(svc.methods[2].roles, None);
    }

    #[test]
    fn default_verb_is_post() {
        let svc = ServiceBuilder::new("Svc", "/api/svc")
            .register_type(TypeDef::object("Out"))
            .method(MethodBuilder::new("DoWork").output("Out"))
            .build()
            .unwrap();
        assert_eq!(svc.methods[0].verb, Method::POST);
        assert_eq!(svc.methods[0].route, None);
    }
}
