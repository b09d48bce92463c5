#![allow(missing_docs)]

//! Resolution of `=`-prefixed setting expressions.
//!
//! The workflow host lets a setting refer to a value held elsewhere:
//! `=$env[MINIO_SECRET]` reads an environment variable and
//! `=$property[bucket]` reads an application property. The activity does not
//! own these registries; a [`Resolver`] is handed to
//! [`Settings::from_map`](crate::Settings::from_map) instead.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{MinioError, Result};

/// Resolves a full expression (without the leading `=`) to a value.
pub trait Resolver: Send + Sync {
    fn resolve(&self, expression: &str) -> Result<Value>;
}

/// Looks up a single name inside one resolver scope (`env`, `property`, `.`).
pub trait ScopedResolver: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Value>;
}

/// Reads process environment variables. Unset variables resolve to `null`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvResolver;

impl ScopedResolver for EnvResolver {
    fn lookup(&self, name: &str) -> Result<Value> {
        Ok(std::env::var(name).map(Value::String).unwrap_or(Value::Null))
    }
}

/// Reads application properties. Unknown properties are an error.
#[derive(Debug, Default, Clone)]
pub struct PropertyResolver {
    properties: Map<String, Value>,
}

impl PropertyResolver {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

impl ScopedResolver for PropertyResolver {
    fn lookup(&self, name: &str) -> Result<Value> {
        self.properties
            .get(name)
            .cloned()
            .ok_or_else(|| MinioError::Config(format!("property '{}' is not defined", name)))
    }
}

/// Reads from a data scope (`$.name`). Dotted names walk nested objects.
#[derive(Debug, Default, Clone)]
pub struct DataScopeResolver {
    scope: Map<String, Value>,
}

impl DataScopeResolver {
    pub fn new(scope: Map<String, Value>) -> Self {
        Self { scope }
    }
}

impl ScopedResolver for DataScopeResolver {
    fn lookup(&self, name: &str) -> Result<Value> {
        let mut parts = name.split('.');
        let first = parts.next().unwrap_or_default();
        let mut current = match self.scope.get(first) {
            Some(value) => value,
            None => return Ok(Value::Null),
        };
        for part in parts {
            current = match current.get(part) {
                Some(value) => value,
                None => return Ok(Value::Null),
            };
        }
        Ok(current.clone())
    }
}

/// Dispatches `$scope[name]` / `$scope.name` expressions to registered scopes.
///
/// Expressions that do not start with `$` are parsed as JSON literals
/// (`=5`, `=true`, `="text"`).
#[derive(Default)]
pub struct CompositeResolver {
    scopes: BTreeMap<String, Box<dyn ScopedResolver>>,
}

impl CompositeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The settings-time scopes: `env`, `property` and an empty data scope.
    pub fn with_defaults(properties: Map<String, Value>) -> Self {
        Self::new()
            .register("env", EnvResolver)
            .register("property", PropertyResolver::new(properties))
            .register(".", DataScopeResolver::default())
    }

    pub fn register(mut self, scope: &str, resolver: impl ScopedResolver + 'static) -> Self {
        self.scopes.insert(scope.to_string(), Box::new(resolver));
        self
    }

    fn parse_reference(expression: &str) -> Option<(&str, &str)> {
        let reference = expression.strip_prefix('$')?;
        if let Some(name) = reference.strip_prefix('.') {
            return Some((".", name));
        }
        if let Some(open) = reference.find('[') {
            let name = reference[open + 1..].strip_suffix(']')?;
            let name = name.trim_matches(|c| c == '"' || c == '\'');
            return Some((&reference[..open], name));
        }
        reference.split_once('.')
    }
}

impl Resolver for CompositeResolver {
    fn resolve(&self, expression: &str) -> Result<Value> {
        let expression = expression.trim();
        if !expression.starts_with('$') {
            return serde_json::from_str(expression).map_err(|_| {
                MinioError::Config(format!("unsupported expression '{}'", expression))
            });
        }

        let (scope, name) = Self::parse_reference(expression).ok_or_else(|| {
            MinioError::Config(format!("malformed reference '{}'", expression))
        })?;

        let resolver = self.scopes.get(scope).ok_or_else(|| {
            MinioError::Config(format!("no resolver registered for scope '{}'", scope))
        })?;

        resolver.lookup(name)
    }
}

/// Resolves `=`-prefixed strings in a value, descending into objects.
pub fn map_value(value: &Value, resolver: &dyn Resolver) -> Result<Value> {
    match value {
        Value::String(s) => match s.strip_prefix('=') {
            Some(expression) => resolver.resolve(expression),
            None => Ok(value.clone()),
        },
        Value::Object(map) => Ok(Value::Object(resolve_object(map, resolver)?)),
        other => Ok(other.clone()),
    }
}

/// Resolves every entry of an object with [`map_value`].
pub fn resolve_object(
    object: &Map<String, Value>,
    resolver: &dyn Resolver,
) -> Result<Map<String, Value>> {
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), map_value(value, resolver)?)))
        .collect()
}
