//! Query parameters and the registry that names them.
//!
//! Parameters are registered while rendering, in order of first appearance in
//! the statement text. A parameter that never renders never reaches the
//! output table, and every placeholder that does render has a slot.

use crate::error::RenderError;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A value bound to the statement through a `$placeholder`.
///
/// Identity is the handle: rendering the same `Param` twice reuses its slot,
/// while two `Param`s with equal values get two slots.
#[derive(Clone)]
pub struct Param(Arc<ParamInner>);

struct ParamInner {
    name: Option<String>,
    value: Value,
}

impl Param {
    /// A parameter whose name is assigned by the registry.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Arc::new(ParamInner {
            name: None,
            value: value.into(),
        }))
    }

    /// A parameter with a fixed name (e.g. `$auth`, custom statement arguments).
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(Arc::new(ParamInner {
            name: Some(name.into()),
            value: value.into(),
        }))
    }

    /// The bound value.
    pub fn value(&self) -> &Value {
        &self.0.value
    }

    /// The fixed name, if this parameter has one.
    pub fn fixed_name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.name {
            Some(name) => write!(f, "Param(${name} = {})", self.0.value),
            None => write!(f, "Param({})", self.0.value),
        }
    }
}

/// Ordered parameter table for one rendered statement.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    slots: IndexMap<String, Value>,
    assigned: HashMap<usize, String>,
    counters: HashMap<String, usize>,
    // Holding the handles keeps their addresses unique for the registry's lifetime.
    handles: Vec<Param>,
}

impl ParamRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `param` and return its name.
    ///
    /// Unnamed parameters get `param<n>` at the top level and
    /// `<scope>_param<n>` inside a scoped sub-query, with one counter per
    /// scope. Registering the same handle again returns the same name.
    pub fn register(&mut self, param: &Param, scope: Option<&str>) -> Result<String, RenderError> {
        if let Some(name) = self.assigned.get(&param.identity()) {
            return Ok(name.clone());
        }

        let name = match param.fixed_name() {
            Some(fixed) => {
                if let Some(existing) = self.slots.get(fixed) {
                    if existing != param.value() {
                        return Err(RenderError::ParamCollision {
                            name: fixed.to_string(),
                        });
                    }
                } else {
                    self.slots.insert(fixed.to_string(), param.value().clone());
                }
                fixed.to_string()
            }
            None => {
                let name = self.next_name(scope);
                self.slots.insert(name.clone(), param.value().clone());
                name
            }
        };

        self.assigned.insert(param.identity(), name.clone());
        self.handles.push(param.clone());
        Ok(name)
    }

    fn next_name(&mut self, scope: Option<&str>) -> String {
        let key = scope.unwrap_or_default().to_string();
        let counter = self.counters.entry(key).or_insert(0);
        loop {
            let name = match scope {
                Some(prefix) => format!("{prefix}_param{counter}"),
                None => format!("param{counter}"),
            };
            *counter += 1;
            if !self.slots.contains_key(&name) {
                return name;
            }
        }
    }

    /// Placeholder text for a registered name.
    pub fn placeholder(name: &str) -> String {
        format!("${}", crate::literal::escape_identifier(name))
    }

    /// Value registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no parameters were registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consume the registry, yielding the ordered parameter map.
    pub fn into_params(self) -> IndexMap<String, Value> {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_assigns_sequential_names() {
        let mut registry = ParamRegistry::new();
        let a = Param::new("a");
        let b = Param::new("b");

        assert_eq!(registry.register(&a, None).unwrap(), "param0");
        assert_eq!(registry.register(&b, None).unwrap(), "param1");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_same_handle_once() {
        let mut registry = ParamRegistry::new();
        let a = Param::new(1);
        let again = a.clone();

        assert_eq!(registry.register(&a, None).unwrap(), "param0");
        assert_eq!(registry.register(&again, None).unwrap(), "param0");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_equal_values_get_distinct_slots() {
        let mut registry = ParamRegistry::new();
        let a = Param::new("x");
        let b = Param::new("x");

        registry.register(&a, None).unwrap();
        registry.register(&b, None).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_scoped_names_use_prefix_counter() {
        let mut registry = ParamRegistry::new();
        registry.register(&Param::new(1), None).unwrap();
        let scoped = registry.register(&Param::new(2), Some("this1")).unwrap();
        let top = registry.register(&Param::new(3), None).unwrap();

        assert_eq!(scoped, "this1_param0");
        assert_eq!(top, "param1");
    }

    #[test]
    fn test_generated_names_skip_fixed_names() {
        let mut registry = ParamRegistry::new();
        registry.register(&Param::named("param0", 1), None).unwrap();
        let generated = registry.register(&Param::new(2), None).unwrap();
        assert_eq!(generated, "param1");
    }

    #[test]
    fn test_fixed_name_collision_with_different_value() {
        let mut registry = ParamRegistry::new();
        registry.register(&Param::named("limit", 5), None).unwrap();

        let same_value = registry.register(&Param::named("limit", 5), None);
        assert_eq!(same_value.unwrap(), "limit");

        let result = registry.register(&Param::named("limit", 10), None);
        assert!(matches!(result, Err(RenderError::ParamCollision { .. })));
    }

    #[test]
    fn test_into_params_preserves_insertion_order() {
        let mut registry = ParamRegistry::new();
        registry.register(&Param::named("auth", json!({})), None).unwrap();
        registry.register(&Param::new("z"), None).unwrap();
        registry.register(&Param::new("a"), None).unwrap();

        let keys: Vec<_> = registry.into_params().keys().cloned().collect();
        assert_eq!(keys, vec!["auth", "param0", "param1"]);
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(ParamRegistry::placeholder("param0"), "$param0");
    }
}
