//! Serde definitions and the registry builder.

use super::{
    Cardinality, CypherArgument, CypherField, NodeType, RelationshipField, ScalarField, ScalarType, TypeRegistry,
};
use crate::auth::{resolve_rules, Operation};
use crate::error::{SchemaError, SchemaResult};
use graft_cypher::{placeholder, Direction};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Definition of a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDef {
    pub name: String,
    /// Defaults to `[name]`.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    #[serde(default)]
    pub cypher_fields: Vec<CypherFieldDef>,
    #[serde(default)]
    pub auth: Vec<AuthRuleDef>,
}

/// Definition of a scalar field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ScalarType,
    /// Database property; defaults to the field name.
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub auth: Vec<AuthRuleDef>,
}

/// Relationship direction as written in definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipDirection {
    #[default]
    Out,
    In,
}

/// Definition of a relationship field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub direction: RelationshipDirection,
    pub target: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// Definition of a custom Cypher field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CypherFieldDef {
    pub name: String,
    pub statement: String,
    #[serde(default = "default_column_name")]
    pub column_name: String,
    /// Node type of the results; scalar results when absent.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub arguments: Vec<CypherArgument>,
}

/// Placeholder every statement may read without declaring it.
pub(crate) const AUTH_PLACEHOLDER: &str = "auth";

fn default_column_name() -> String {
    "result".to_string()
}

/// Raw rule as written in definitions; bodies stay JSON until resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRuleDef {
    #[serde(default)]
    pub operations: Option<Vec<Operation>>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub is_authenticated: Option<bool>,
    #[serde(default)]
    pub allow: Option<Value>,
    #[serde(default)]
    pub bind: Option<Value>,
    #[serde(default, rename = "where")]
    pub filter: Option<Value>,
    #[serde(default, rename = "AND")]
    pub and: Option<Vec<AuthRuleDef>>,
    #[serde(default, rename = "OR")]
    pub or: Option<Vec<AuthRuleDef>>,
    #[serde(default)]
    pub allow_unauthenticated: Option<bool>,
}

/// Collects definitions and builds a validated [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    defs: Vec<NodeTypeDef>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one definition.
    pub fn add_type(mut self, def: NodeTypeDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Add definitions from a JSON array.
    pub fn add_json(mut self, value: Value) -> Result<Self, serde_json::Error> {
        let defs: Vec<NodeTypeDef> = serde_json::from_value(value)?;
        self.defs.extend(defs);
        Ok(self)
    }

    /// Validate relationship targets and resolve every rule body.
    pub fn build(self) -> SchemaResult<TypeRegistry> {
        let mut types: IndexMap<String, NodeType> = IndexMap::with_capacity(self.defs.len());
        for def in &self.defs {
            if types.contains_key(&def.name) {
                return Err(SchemaError::DuplicateType { name: def.name.clone() });
            }
            types.insert(def.name.clone(), skeleton(def)?);
        }

        for ty in types.values() {
            for rel in ty.relationships.values() {
                if !types.contains_key(&rel.target) {
                    return Err(SchemaError::UnknownTarget {
                        type_name: ty.name.clone(),
                        field: rel.name.clone(),
                        target: rel.target.clone(),
                    });
                }
            }
            for field in ty.cypher_fields.values() {
                if let Some(target) = &field.target {
                    if !types.contains_key(target) {
                        return Err(SchemaError::UnknownTarget {
                            type_name: ty.name.clone(),
                            field: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        // Rules can reference any type, so resolve against the complete
        // skeleton set before attaching.
        let mut resolved = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            let owner = &types[&def.name];
            let type_rules = resolve_rules(&def.auth, owner, &types)?;
            let mut field_rules = Vec::new();
            for field in &def.fields {
                if !field.auth.is_empty() {
                    field_rules.push((field.name.clone(), resolve_rules(&field.auth, owner, &types)?));
                }
            }
            resolved.push((def.name.clone(), type_rules, field_rules));
        }

        for (name, type_rules, field_rules) in resolved {
            if let Some(ty) = types.get_mut(&name) {
                ty.auth = type_rules;
                for (field, rules) in field_rules {
                    if let Some(field) = ty.fields.get_mut(&field) {
                        field.auth = rules;
                    }
                }
            }
        }

        debug!(types = types.len(), "built type registry");
        Ok(TypeRegistry { types })
    }
}

fn skeleton(def: &NodeTypeDef) -> SchemaResult<NodeType> {
    let mut ty = NodeType {
        name: def.name.clone(),
        labels: if def.labels.is_empty() {
            vec![def.name.clone()]
        } else {
            def.labels.clone()
        },
        fields: IndexMap::new(),
        relationships: IndexMap::new(),
        cypher_fields: IndexMap::new(),
        auth: Vec::new(),
    };

    let duplicate = |field: &str| SchemaError::DuplicateField {
        type_name: def.name.clone(),
        field: field.to_string(),
    };

    for field in &def.fields {
        if ty.has_field(&field.name) {
            return Err(duplicate(&field.name));
        }
        ty.fields.insert(
            field.name.clone(),
            ScalarField {
                name: field.name.clone(),
                property: field.property.clone().unwrap_or_else(|| field.name.clone()),
                ty: field.ty,
                list: field.list,
                auth: Vec::new(),
            },
        );
    }
    for rel in &def.relationships {
        if ty.has_field(&rel.name) {
            return Err(duplicate(&rel.name));
        }
        ty.relationships.insert(
            rel.name.clone(),
            RelationshipField {
                name: rel.name.clone(),
                rel_type: rel.rel_type.clone(),
                direction: match rel.direction {
                    RelationshipDirection::Out => Direction::Out,
                    RelationshipDirection::In => Direction::In,
                },
                target: rel.target.clone(),
                cardinality: rel.cardinality,
            },
        );
    }
    for field in &def.cypher_fields {
        if ty.has_field(&field.name) {
            return Err(duplicate(&field.name));
        }
        check_placeholders(def, field)?;
        ty.cypher_fields.insert(
            field.name.clone(),
            CypherField {
                name: field.name.clone(),
                statement: field.statement.clone(),
                column: field.column_name.clone(),
                target: field.target.clone(),
                list: field.list,
                arguments: field.arguments.clone(),
            },
        );
    }
    Ok(ty)
}

/// Every placeholder of the statement must be a declared argument or
/// `$auth`, and argument names must be unique and not shadow `$auth`.
fn check_placeholders(def: &NodeTypeDef, field: &CypherFieldDef) -> SchemaResult<()> {
    let invalid = |reason: String| SchemaError::InvalidCypherField {
        type_name: def.name.clone(),
        field: field.name.clone(),
        reason,
    };

    for (i, argument) in field.arguments.iter().enumerate() {
        if argument.name == AUTH_PLACEHOLDER {
            return Err(invalid(format!("argument name {AUTH_PLACEHOLDER} is reserved")));
        }
        if field.arguments[..i].iter().any(|a| a.name == argument.name) {
            return Err(invalid(format!("argument {} declared twice", argument.name)));
        }
    }
    for name in placeholder::names(&field.statement) {
        if name != AUTH_PLACEHOLDER && !field.arguments.iter().any(|a| a.name == name) {
            return Err(invalid(format!("statement reads undeclared ${name}")));
        }
    }
    Ok(())
}
