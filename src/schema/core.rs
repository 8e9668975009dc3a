use crate::contract::{
    BindingMode, JsonCasing, ServiceDescriptor, TargetType, TypeDef, TypeRegistry,
};
use crate::error::RegistrationError;
use crate::resolver::resolve_route;
use http::Method;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Top-level identity of the generated API document.
#[derive(Debug, Clone)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl ApiInfo {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Build one OpenAPI 3.0 document covering every method of the given
/// services.
///
/// The document is derived from the same descriptors and the same route
/// resolution the router uses, so paths, parameter names, and verbs in the
/// document always agree with what the table will actually match. All maps
/// are key-ordered, making repeated generation from the same descriptors
/// byte-identical.
pub fn build_document(
    info: &ApiInfo,
    services: &[Arc<ServiceDescriptor>],
) -> Result<Value, RegistrationError> {
    let mut paths: Map<String, Value> = Map::new();
    let mut schemas: Map<String, Value> = Map::new();
    let mut seen: HashSet<(Method, String)> = HashSet::new();

    for service in services {
        for method in &service.methods {
            let route = resolve_route(service, method);
            if !seen.insert((route.verb.clone(), route.path.clone())) {
                return Err(RegistrationError::DuplicateRoute {
                    verb: route.verb,
                    path: route.path,
                });
            }

            if !method.output_type.is_empty() {
                collect_type_schemas(
                    &method.output_type,
                    &service.types,
                    service.casing,
                    &mut schemas,
                )?;
            }
            if let Some(input) = &method.input_type {
                collect_type_schemas(input, &service.types, service.casing, &mut schemas)?;
            }

            let operation = build_operation(service, method)?;
            let verb_key = route.verb.as_str().to_lowercase();
            let entry = paths
                .entry(route.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(item) = entry {
                item.insert(verb_key, operation);
            }

            debug!(
                service = %service.name,
                method = %method.name,
                path = %route.path,
                "Operation documented"
            );
        }
    }

    let mut info_obj = Map::new();
    info_obj.insert("title".into(), json!(info.title));
    info_obj.insert("version".into(), json!(info.version));
    if let Some(description) = &info.description {
        info_obj.insert("description".into(), json!(description));
    }

    let tags: Vec<Value> = services
        .iter()
        .map(|service| {
            let mut tag = Map::new();
            tag.insert("name".into(), json!(service.name));
            if !service.description.is_empty() {
                tag.insert("description".into(), json!(service.description));
            }
            Value::Object(tag)
        })
        .collect();

    Ok(json!({
        "openapi": "3.0.0",
        "info": Value::Object(info_obj),
        "tags": Value::Array(tags),
        "paths": Value::Object(paths),
        "components": { "schemas": Value::Object(schemas) },
    }))
}

fn build_operation(
    service: &ServiceDescriptor,
    method: &crate::contract::MethodDescriptor,
) -> Result<Value, RegistrationError> {
    let mut op = Map::new();
    op.insert("operationId".into(), json!(method.name));
    if !method.summary.is_empty() {
        op.insert("summary".into(), json!(method.summary));
    }
    if !method.description.is_empty() {
        op.insert("description".into(), json!(method.description));
    }
    if method.deprecated {
        op.insert("deprecated".into(), json!(true));
    }
    op.insert("tags".into(), json!([service.name]));

    let mut parameters = Vec::new();
    for binding in method.inline_bindings() {
        parameters.push(json!({
            "name": binding.name,
            "in": "path",
            "required": true,
            "schema": scalar_schema(&binding.target),
        }));
    }
    for binding in method.named_bindings() {
        parameters.push(json!({
            "name": binding.name,
            "in": "query",
            "required": binding.required,
            "schema": scalar_schema(&binding.target),
        }));
    }
    if !parameters.is_empty() {
        op.insert("parameters".into(), Value::Array(parameters));
    }

    let has_body_binding = method
        .bindings
        .iter()
        .any(|b| matches!(b.mode, BindingMode::Body));
    if method.verb != Method::GET && has_body_binding {
        if let Some(input) = &method.input_type {
            op.insert(
                "requestBody".into(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": { "schema": schema_ref(input) }
                    }
                }),
            );
        }
    }

    let response_content = if method.output_type.is_empty() {
        json!({ "description": "Success" })
    } else {
        json!({
            "description": "Success",
            "content": {
                "application/json": { "schema": schema_ref(&method.output_type) }
            }
        })
    };
    op.insert("responses".into(), json!({ "200": response_content }));

    Ok(Value::Object(op))
}

/// Register `type_name` and every object type reachable from it under
/// `components/schemas`.
///
/// A placeholder is inserted before recursing so self-referential type
/// graphs terminate; the placeholder is replaced once the real schema is
/// built.
fn collect_type_schemas(
    type_name: &str,
    types: &TypeRegistry,
    casing: JsonCasing,
    schemas: &mut Map<String, Value>,
) -> Result<(), RegistrationError> {
    if schemas.contains_key(type_name) {
        return Ok(());
    }
    let def = types
        .get(type_name)
        .ok_or_else(|| RegistrationError::UnknownType {
            method: String::new(),
            type_name: type_name.to_string(),
        })?;

    schemas.insert(type_name.to_string(), Value::Null);
    let schema = object_schema(def, types, casing, schemas)?;
    schemas.insert(type_name.to_string(), schema);
    Ok(())
}

fn object_schema(
    def: &TypeDef,
    types: &TypeRegistry,
    casing: JsonCasing,
    schemas: &mut Map<String, Value>,
) -> Result<Value, RegistrationError> {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for prop in &def.properties {
        let key = casing.apply(&prop.name);
        let mut schema = property_schema(&prop.target, types, casing, schemas)?;
        if let Value::Object(obj) = &mut schema {
            if let Some(text) = &prop.description {
                obj.insert("description".into(), json!(text));
            }
            if prop.deprecated {
                obj.insert("deprecated".into(), json!(true));
            }
        }
        if prop.required {
            required.push(json!(key));
        }
        properties.insert(key, schema);
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    if let Some(text) = &def.description {
        schema.insert("description".into(), json!(text));
    }
    if def.deprecated {
        schema.insert("deprecated".into(), json!(true));
    }
    if !properties.is_empty() {
        schema.insert("properties".into(), Value::Object(properties));
    }
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    Ok(Value::Object(schema))
}

fn property_schema(
    target: &TargetType,
    types: &TypeRegistry,
    casing: JsonCasing,
    schemas: &mut Map<String, Value>,
) -> Result<Value, RegistrationError> {
    match target {
        TargetType::Nullable(inner) => {
            let mut schema = property_schema(inner, types, casing, schemas)?;
            if let Value::Object(obj) = &mut schema {
                obj.insert("nullable".into(), json!(true));
            }
            Ok(schema)
        }
        TargetType::List(inner) => {
            let items = property_schema(inner, types, casing, schemas)?;
            Ok(json!({ "type": "array", "items": items }))
        }
        TargetType::Object(name) => {
            collect_type_schemas(name, types, casing, schemas)?;
            Ok(schema_ref(name))
        }
        scalar => Ok(scalar_schema(scalar)),
    }
}

/// Schema for a scalar target. Compound targets never reach here from the
/// parameter path because binding derivation forbids them in URLs.
fn scalar_schema(target: &TargetType) -> Value {
    match target {
        TargetType::String => json!({ "type": "string" }),
        TargetType::Int => json!({ "type": "integer", "format": "int64" }),
        TargetType::Float => json!({ "type": "number", "format": "double" }),
        TargetType::Bool => json!({ "type": "boolean" }),
        TargetType::DateTime => json!({ "type": "string", "format": "date-time" }),
        TargetType::Uuid => json!({ "type": "string", "format": "uuid" }),
        TargetType::Bytes => json!({ "type": "string", "format": "byte" }),
        TargetType::Enum(names) => json!({ "type": "string", "enum": names }),
        TargetType::Nullable(inner) => {
            let mut schema = scalar_schema(inner);
            if let Value::Object(obj) = &mut schema {
                obj.insert("nullable".into(), json!(true));
            }
            schema
        }
        TargetType::List(_) | TargetType::Object(_) => json!({ "type": "object" }),
    }
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}
