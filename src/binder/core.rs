use super::convert::convert;
use crate::contract::{MethodDescriptor, PropertySpec, TypeRegistry};
use crate::error::BindingError;
use crate::router::ParamVec;
use serde_json::{Map, Value};
use tracing::debug;

/// Produce one fully populated input object for a matched method.
///
/// Sources are applied in a fixed total order that callers rely on:
/// 1. the request body seeds the object (structural defaults);
/// 2. query-string values refine matching properties;
/// 3. captured path variables overwrite last and therefore always win.
///
/// Property matching against body keys, query keys, and path captures is
/// case-insensitive; the produced object always carries the canonical
/// declared property names. A method without an input type yields an empty
/// (zero-valued) object.
pub fn bind_input(
    method: &MethodDescriptor,
    types: &TypeRegistry,
    path_params: &ParamVec,
    query_params: &ParamVec,
    body: &[u8],
) -> Result<Value, BindingError> {
    let Some(type_name) = &method.input_type else {
        return Ok(Value::Object(Map::new()));
    };
    let def = types
        .get(type_name)
        .ok_or_else(|| BindingError::UnknownInputType {
            type_name: type_name.clone(),
        })?;

    let mut object = if body.is_empty() {
        Map::new()
    } else {
        let parsed: Value =
            serde_json::from_slice(body).map_err(|e| BindingError::InvalidBody {
                detail: e.to_string(),
            })?;
        match parsed {
            Value::Object(map) => normalize_keys(map, &def.properties),
            other => {
                return Err(BindingError::InvalidBody {
                    detail: format!("expected a JSON object, got {}", json_kind(&other)),
                })
            }
        }
    };

    // Query refines the body...
    for (key, value) in query_params {
        let Some(binding) = find_binding(method, key) else {
            continue;
        };
        let converted = convert(&binding.name, value, &binding.target)?;
        object.insert(binding.name.clone(), converted);
    }

    // ...and path captures overwrite last, so the most specific match
    // context always wins.
    for (key, value) in path_params {
        let Some(binding) = find_binding(method, key) else {
            continue;
        };
        let converted = convert(&binding.name, value, &binding.target)?;
        object.insert(binding.name.clone(), converted);
    }

    debug!(
        method = %method.name,
        input_type = %type_name,
        properties = object.len(),
        "Input object bound"
    );

    Ok(Value::Object(object))
}

/// Case-insensitive binding lookup by property name.
fn find_binding<'a>(
    method: &'a MethodDescriptor,
    key: &str,
) -> Option<&'a crate::contract::ParameterBinding> {
    method
        .bindings
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(key))
}

/// Re-key body fields onto their canonical declared property names.
/// Unknown body keys are preserved as-is; the input type's deserializer
/// decides what to do with them.
fn normalize_keys(map: Map<String, Value>, properties: &[PropertySpec]) -> Map<String, Value> {
    let mut normalized = Map::new();
    for (key, value) in map {
        let canonical = properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(&key))
            .map(|p| p.name.clone())
            .unwrap_or(key);
        normalized.insert(canonical, value);
    }
    normalized
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
