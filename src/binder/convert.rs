//! Typed string conversion for URL-sourced parameter values.
//!
//! Invariants (tested independently of the binder):
//! - the empty string parses to each type's zero value, never an error,
//!   except free-form strings (pass through) and byte arrays (empty array,
//!   not null);
//! - boolean parsing accepts case-insensitive `true`, `on`, `1`, `yes`;
//!   anything else is false;
//! - a nullable target of `"null"` (case-insensitive) or `""` yields an
//!   absent value, any other string recurses into the underlying type;
//! - unsupported targets fail naming the offending property, never
//!   silently dropping data.

use crate::contract::TargetType;
use crate::error::BindingError;
use serde_json::Value;

/// Zero value for timestamps, mirroring a minimum calendar instant.
pub const MIN_DATE_TIME: &str = "0001-01-01T00:00:00";

/// Zero value for UUID targets.
pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Convert one URL string into a typed JSON value for `property`.
pub fn convert(property: &str, raw: &str, target: &TargetType) -> Result<Value, BindingError> {
    let is_empty = raw.is_empty();
    match target {
        TargetType::String => Ok(Value::String(raw.to_string())),
        TargetType::Int => {
            if is_empty {
                return Ok(Value::from(0i64));
            }
            raw.parse::<i64>()
                .map(Value::from)
                .map_err(|_| unparseable(property, raw, target))
        }
        TargetType::Float => {
            if is_empty {
                return Ok(Value::from(0.0f64));
            }
            let parsed = raw
                .parse::<f64>()
                .map_err(|_| unparseable(property, raw, target))?;
            serde_json::Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| unparseable(property, raw, target))
        }
        TargetType::Bool => {
            let lowered = raw.to_lowercase();
            Ok(Value::Bool(matches!(
                lowered.as_str(),
                "true" | "on" | "1" | "yes"
            )))
        }
        TargetType::DateTime => {
            if is_empty {
                Ok(Value::String(MIN_DATE_TIME.to_string()))
            } else {
                Ok(Value::String(raw.to_string()))
            }
        }
        TargetType::Uuid => {
            if is_empty {
                return Ok(Value::String(NIL_UUID.to_string()));
            }
            if is_uuid(raw) {
                Ok(Value::String(raw.to_lowercase()))
            } else {
                Err(unparseable(property, raw, target))
            }
        }
        // Byte arrays are not supported as URL values; an empty array keeps
        // the property populated rather than null.
        TargetType::Bytes => Ok(Value::Array(Vec::new())),
        TargetType::Enum(names) => names
            .iter()
            .find(|n| n.as_str() == raw)
            .map(|n| Value::String(n.clone()))
            .ok_or_else(|| unparseable(property, raw, target)),
        TargetType::Nullable(inner) => {
            if is_empty || raw.eq_ignore_ascii_case("null") {
                Ok(Value::Null)
            } else {
                convert(property, raw, inner)
            }
        }
        TargetType::List(_) | TargetType::Object(_) => Err(BindingError::UnsupportedTarget {
            property: property.to_string(),
            target: target.describe(),
        }),
    }
}

fn unparseable(property: &str, raw: &str, target: &TargetType) -> BindingError {
    BindingError::Unparseable {
        property: property.to_string(),
        value: raw.to_string(),
        target: target.describe(),
    }
}

/// Loose 8-4-4-4-12 hex shape check, enough to reject garbage without a
/// dedicated UUID dependency.
fn is_uuid(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('-').collect();
    parts.len() == 5
        && parts
            .iter()
            .zip([8usize, 4, 4, 4, 12])
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_parses_to_zero_values() {
        assert_eq!(convert("P", "", &TargetType::Int).unwrap(), json!(0));
        assert_eq!(convert("P", "", &TargetType::Float).unwrap(), json!(0.0));
        assert_eq!(convert("P", "", &TargetType::Bool).unwrap(), json!(false));
        assert_eq!(
            convert("P", "", &TargetType::DateTime).unwrap(),
            json!(MIN_DATE_TIME)
        );
        assert_eq!(convert("P", "", &TargetType::Uuid).unwrap(), json!(NIL_UUID));
    }

    #[test]
    fn strings_pass_through_untouched() {
        assert_eq!(convert("P", "", &TargetType::String).unwrap(), json!(""));
        assert_eq!(
            convert("P", "hello world", &TargetType::String).unwrap(),
            json!("hello world")
        );
    }

    #[test]
    fn byte_arrays_yield_empty_array_not_null() {
        assert_eq!(convert("P", "abc", &TargetType::Bytes).unwrap(), json!([]));
        assert_eq!(convert("P", "", &TargetType::Bytes).unwrap(), json!([]));
    }

    #[test]
    fn boolean_accepts_the_truthy_spellings() {
        for truthy in ["true", "TRUE", "on", "On", "1", "yes", "YES"] {
            assert_eq!(
                convert("P", truthy, &TargetType::Bool).unwrap(),
                json!(true),
                "{truthy} should be true"
            );
        }
        for falsy in ["false", "off", "0", "no", "banana", ""] {
            assert_eq!(
                convert("P", falsy, &TargetType::Bool).unwrap(),
                json!(false),
                "{falsy} should be false"
            );
        }
    }

    #[test]
    fn enums_parse_by_name() {
        let target = TargetType::Enum(vec!["Active".into(), "Inactive".into()]);
        assert_eq!(convert("P", "Active", &target).unwrap(), json!("Active"));
        assert!(matches!(
            convert("P", "unknown", &target),
            Err(BindingError::Unparseable { .. })
        ));
    }

    #[test]
    fn nullable_recognizes_null_and_empty() {
        let target = TargetType::Nullable(Box::new(TargetType::Int));
        assert_eq!(convert("P", "null", &target).unwrap(), Value::Null);
        assert_eq!(convert("P", "NULL", &target).unwrap(), Value::Null);
        assert_eq!(convert("P", "", &target).unwrap(), Value::Null);
        assert_eq!(convert("P", "7", &target).unwrap(), json!(7));
    }

    #[test]
    fn unparseable_numbers_name_the_property() {
        match convert("CustomerId", "abc", &TargetType::Int) {
            Err(BindingError::Unparseable { property, .. }) => {
                assert_eq!(property, "CustomerId");
            }
            other => panic!("expected Unparseable, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_targets_name_the_property() {
        let target = TargetType::Object("Customer".into());
        match convert("Customer", "x", &target) {
            Err(BindingError::UnsupportedTarget { property, .. }) => {
                assert_eq!(property, "Customer");
            }
            other => panic!("expected UnsupportedTarget, got {other:?}"),
        }
    }

    #[test]
    fn uuid_shape_is_validated() {
        assert!(convert("P", "6ba7b810-9dad-11d1-80b4-00c04fd430c8", &TargetType::Uuid).is_ok());
        assert!(convert("P", "not-a-uuid", &TargetType::Uuid).is_err());
    }
}
