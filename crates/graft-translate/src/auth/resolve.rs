//! Resolution of raw rule definitions against schema metadata.

use super::context_ref::ContextReference;
use super::rule::{AuthRule, Combinator, RuleBody, RuleEntry, RuleSection, RuleValue};
use crate::error::{SchemaError, SchemaResult};
use crate::schema::{AuthRuleDef, NodeType};
use indexmap::IndexMap;
use serde_json::Value;

/// Resolve every rule of `owner`.
pub(crate) fn resolve_rules(
    defs: &[AuthRuleDef],
    owner: &NodeType,
    types: &IndexMap<String, NodeType>,
) -> SchemaResult<Vec<AuthRule>> {
    defs.iter().map(|def| resolve_rule(def, owner, types)).collect()
}

fn resolve_rule(def: &AuthRuleDef, owner: &NodeType, types: &IndexMap<String, NodeType>) -> SchemaResult<AuthRule> {
    let section = |value: &Option<Value>| -> SchemaResult<Option<RuleSection>> {
        value.as_ref().map(|v| resolve_section(v, owner, types)).transpose()
    };

    Ok(AuthRule {
        operations: def.operations.clone(),
        roles: def.roles.clone(),
        is_authenticated: def.is_authenticated,
        allow: section(&def.allow)?,
        bind: section(&def.bind)?,
        filter: section(&def.filter)?,
        and: resolve_rules(def.and.as_deref().unwrap_or_default(), owner, types)?,
        or: resolve_rules(def.or.as_deref().unwrap_or_default(), owner, types)?,
        allow_unauthenticated: def.allow_unauthenticated.unwrap_or(false),
    })
}

fn resolve_section(value: &Value, owner: &NodeType, types: &IndexMap<String, NodeType>) -> SchemaResult<RuleSection> {
    match value {
        Value::String(s) if s == "*" => Ok(RuleSection::Any),
        _ => resolve_body(value, owner, types).map(RuleSection::Body),
    }
}

fn invalid(owner: &NodeType, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidRule {
        type_name: owner.name.clone(),
        reason: reason.into(),
    }
}

fn resolve_body(value: &Value, owner: &NodeType, types: &IndexMap<String, NodeType>) -> SchemaResult<RuleBody> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(owner, format!("rule body must be an object, got {value}")))?;

    let mut entries = Vec::with_capacity(object.len());
    for (key, value) in object {
        let entry = match key.as_str() {
            "AND" | "OR" => {
                let op = if key == "AND" { Combinator::And } else { Combinator::Or };
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid(owner, format!("{key} must be an array")))?;
                let bodies = items
                    .iter()
                    .map(|item| resolve_body(item, owner, types))
                    .collect::<SchemaResult<Vec<_>>>()?;
                RuleEntry::Combinator { op, bodies }
            }
            name => {
                if let Some(field) = owner.field(name) {
                    RuleEntry::Scalar {
                        field: field.name.clone(),
                        property: field.property.clone(),
                        ty: field.ty,
                        value: resolve_value(value),
                    }
                } else if let Some(rel) = owner.relationship(name) {
                    let target = types.get(&rel.target).ok_or_else(|| SchemaError::UnknownTarget {
                        type_name: owner.name.clone(),
                        field: rel.name.clone(),
                        target: rel.target.clone(),
                    })?;
                    if !value.is_object() {
                        return Err(invalid(owner, format!("relationship entry {name} must be an object")));
                    }
                    RuleEntry::Relationship {
                        field: rel.name.clone(),
                        rel_type: rel.rel_type.clone(),
                        direction: rel.direction,
                        target_labels: target.labels.clone(),
                        body: resolve_body(value, target, types)?,
                    }
                } else {
                    return Err(SchemaError::UnknownField {
                        type_name: owner.name.clone(),
                        field: name.to_string(),
                    });
                }
            }
        };
        entries.push(entry);
    }
    Ok(RuleBody { entries })
}

fn resolve_value(value: &Value) -> RuleValue {
    match value.as_str().and_then(ContextReference::parse) {
        Some(reference) => RuleValue::Context(reference),
        None => RuleValue::Literal(value.clone()),
    }
}
