//! Resolved schema metadata.
//!
//! A [`TypeRegistry`] is built once from [`NodeTypeDef`]s by
//! [`TypeRegistryBuilder`] and is immutable afterwards. Auth rule bodies are
//! resolved against the registry during the build, so translation never
//! inspects raw rule JSON.

mod def;

pub(crate) use def::AUTH_PLACEHOLDER;
pub use def::{AuthRuleDef, CypherFieldDef, FieldDef, NodeTypeDef, RelationshipDef, TypeRegistryBuilder};

use crate::auth::AuthRule;
use graft_cypher::Direction;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    #[serde(rename = "ID")]
    Id,
    String,
    Int,
    BigInt,
    Float,
    Boolean,
    DateTime,
    Date,
    Time,
    LocalDateTime,
    LocalTime,
    Duration,
    Point,
    CartesianPoint,
}

impl ScalarType {
    /// Cypher function that turns a parameter into a value of this type, for
    /// temporal and spatial types.
    pub fn constructor(self) -> Option<&'static str> {
        match self {
            ScalarType::DateTime => Some("datetime"),
            ScalarType::Date => Some("date"),
            ScalarType::Time => Some("time"),
            ScalarType::LocalDateTime => Some("localdatetime"),
            ScalarType::LocalTime => Some("localtime"),
            ScalarType::Duration => Some("duration"),
            ScalarType::Point | ScalarType::CartesianPoint => Some("point"),
            _ => None,
        }
    }

    /// Whether the type has a total order usable by `min`/`max`/`_LT`.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ScalarType::Boolean | ScalarType::Point | ScalarType::CartesianPoint)
    }

    /// Whether `sum`/`average` apply.
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::BigInt | ScalarType::Float)
    }
}

/// How many nodes a relationship field yields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    One,
    #[default]
    Many,
}

/// A scalar field stored as a node property.
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub name: String,
    /// Database property name.
    pub property: String,
    pub ty: ScalarType,
    pub list: bool,
    /// Field-level rules.
    pub auth: Vec<AuthRule>,
}

/// A field that follows a relationship to another node type.
#[derive(Debug, Clone)]
pub struct RelationshipField {
    pub name: String,
    pub rel_type: String,
    /// Direction from the owning node.
    pub direction: Direction,
    pub target: String,
    pub cardinality: Cardinality,
}

/// A field computed by a caller-supplied Cypher statement.
#[derive(Debug, Clone)]
pub struct CypherField {
    pub name: String,
    /// Statement text; reads the owning node as `this`.
    pub statement: String,
    /// Column the statement returns.
    pub column: String,
    /// Node type of the returned values, when they are nodes.
    pub target: Option<String>,
    pub list: bool,
    /// Arguments the statement reads as `$name`.
    pub arguments: Vec<CypherArgument>,
}

impl CypherField {
    pub fn argument(&self, name: &str) -> Option<&CypherArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// A declared argument of a custom statement field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CypherArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ScalarType,
    #[serde(default)]
    pub list: bool,
    /// Bound when the selection omits the argument; `null` when absent.
    #[serde(default)]
    pub default: Option<Value>,
}

/// A node type with its labels, fields and type-level rules.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: String,
    /// Labels in declared order.
    pub labels: Vec<String>,
    pub fields: IndexMap<String, ScalarField>,
    pub relationships: IndexMap<String, RelationshipField>,
    pub cypher_fields: IndexMap<String, CypherField>,
    pub auth: Vec<AuthRule>,
}

impl NodeType {
    pub fn field(&self, name: &str) -> Option<&ScalarField> {
        self.fields.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipField> {
        self.relationships.get(name)
    }

    pub fn cypher_field(&self, name: &str) -> Option<&CypherField> {
        self.cypher_fields.get(name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
            || self.relationships.contains_key(name)
            || self.cypher_fields.contains_key(name)
    }
}

/// Immutable set of node types, shared across translations.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, NodeType>,
}

impl TypeRegistry {
    /// Start building a registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// All types in definition order.
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
