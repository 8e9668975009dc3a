use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

/// JSON field-casing policy applied to the response envelope of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonCasing {
    /// Property names are emitted exactly as declared.
    AsIs,
    /// Property names are emitted camelCased (`FailureInformation` ->
    /// `failureInformation`).
    #[default]
    CamelCase,
}

impl JsonCasing {
    /// Apply the policy to a declared property name.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        match self {
            JsonCasing::AsIs => name.to_string(),
            JsonCasing::CamelCase => {
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Declared type of a bindable property.
///
/// Replaces the original model's runtime type handles with an explicit,
/// closed set of shapes the binder and schema generator both understand.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetType {
    String,
    Int,
    Float,
    Bool,
    /// RFC 3339 timestamp carried as a string.
    DateTime,
    Uuid,
    /// Raw byte payloads. URL binding always yields an empty array.
    Bytes,
    /// Enumeration parsed by variant name.
    Enum(Vec<String>),
    /// Optional wrapper; unwrapped before conversion and schema emission.
    Nullable(Box<TargetType>),
    /// Homogeneous list; the element type is unwrapped one level in the
    /// schema walk.
    List(Box<TargetType>),
    /// Reference to a registered [`TypeDef`] by name.
    Object(String),
}

impl TargetType {
    /// Scalars convert from URL strings; lists and objects do not.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        match self {
            TargetType::List(_) | TargetType::Object(_) => false,
            TargetType::Nullable(inner) => inner.is_scalar(),
            _ => true,
        }
    }

    /// Short name used in error messages and tracing fields.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            TargetType::String => "string".into(),
            TargetType::Int => "integer".into(),
            TargetType::Float => "number".into(),
            TargetType::Bool => "boolean".into(),
            TargetType::DateTime => "date-time".into(),
            TargetType::Uuid => "uuid".into(),
            TargetType::Bytes => "bytes".into(),
            TargetType::Enum(_) => "enum".into(),
            TargetType::Nullable(inner) => format!("nullable {}", inner.describe()),
            TargetType::List(inner) => format!("list of {}", inner.describe()),
            TargetType::Object(name) => name.clone(),
        }
    }
}

/// URL binding hint declared on a property of an input type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlBinding {
    /// The value is a positional path segment appended to derived routes.
    /// Sequence numbers order the segments; ties break by declaration order.
    Inline { sequence: i32 },
    /// The value is sourced from the query string by property name.
    Named,
}

/// One property of a registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub target: TargetType,
    pub binding: Option<UrlBinding>,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            name: name.into(),
            target,
            binding: None,
            required: false,
            description: None,
            deprecated: false,
            deprecation_reason: None,
        }
    }

    /// Mark the property as a positional path segment.
    #[must_use]
    pub fn inline(mut self, sequence: i32) -> Self {
        self.binding = Some(UrlBinding::Inline { sequence });
        self
    }

    /// Mark the property as a named query-string parameter.
    #[must_use]
    pub fn named(mut self) -> Self {
        self.binding = Some(UrlBinding::Named);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// A registered input/output/nested type shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub properties: Vec<PropertySpec>,
}

impl TypeDef {
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecated: false,
            deprecation_reason: None,
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecated = true;
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }
}

/// Lookup table of every type a service's methods reference.
///
/// Built once at registration and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDef>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: TypeDef) {
        self.types.insert(def.name.clone(), Arc::new(def));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<TypeDef>> {
        self.types.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

/// How a bindable property sources its value at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Positional path segment, ordered by sequence number.
    PathInline { sequence: i32 },
    /// Named query-string parameter, order-independent and optional.
    QueryNamed,
    /// Populated from the deserialized request body.
    Body,
}

/// One bindable property of a method's input type, with its resolved mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub name: String,
    pub target: TargetType,
    pub mode: BindingMode,
    pub required: bool,
}

/// Immutable description of one contract method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub verb: Method,
    /// Explicit route template. `None` means "derive from name";
    /// `Some("")` is a valid root route and must stay distinct from `None`.
    pub route: Option<String>,
    pub display_name: Option<String>,
    /// `None` = no restriction; `Some(vec![])` = any authenticated
    /// principal; otherwise the caller must hold at least one listed role.
    pub roles: Option<Vec<String>>,
    pub content_type: Option<String>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
    /// The target method completes asynchronously; the dispatcher awaits
    /// it either way, this flag only feeds tracing.
    pub is_async: bool,
    pub summary: String,
    pub description: String,
    pub input_type: Option<String>,
    pub output_type: String,
    /// Derived from the input type's properties in declaration order.
    pub bindings: Vec<ParameterBinding>,
}

impl MethodDescriptor {
    /// Inline path bindings sorted by sequence number, declaration order
    /// breaking ties (the sort is stable).
    #[must_use]
    pub fn inline_bindings(&self) -> Vec<&ParameterBinding> {
        let mut inline: Vec<&ParameterBinding> = self
            .bindings
            .iter()
            .filter(|b| matches!(b.mode, BindingMode::PathInline { .. }))
            .collect();
        inline.sort_by_key(|b| match b.mode {
            BindingMode::PathInline { sequence } => sequence,
            _ => 0,
        });
        inline
    }

    /// Named query bindings in declaration order.
    #[must_use]
    pub fn named_bindings(&self) -> Vec<&ParameterBinding> {
        self.bindings
            .iter()
            .filter(|b| b.mode == BindingMode::QueryNamed)
            .collect()
    }
}

/// Immutable description of one hosted service contract.
///
/// Created once at registration; every route, binding, and schema decision
/// afterwards reads from this graph, never from ambient state.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_path: String,
    pub casing: JsonCasing,
    /// The service refuses plain-transport requests when set.
    pub require_secure: bool,
    pub description: String,
    pub methods: Vec<Arc<MethodDescriptor>>,
    pub types: TypeRegistry,
}
