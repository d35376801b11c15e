//! Error types for schema loading and translation

use graft_cypher::RenderError;
use thiserror::Error;

/// Schema definition error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two definitions share a type name
    #[error("Duplicate type: {name}")]
    DuplicateType { name: String },

    /// Two fields of one type share a name
    #[error("Duplicate field {type_name}.{field}")]
    DuplicateField { type_name: String, field: String },

    /// A type name that is not defined
    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    /// A rule body names a field the type does not have
    #[error("Unknown field {type_name}.{field}")]
    UnknownField { type_name: String, field: String },

    /// A relationship points at a type that is not defined
    #[error("Relationship {type_name}.{field} targets unknown type {target}")]
    UnknownTarget {
        type_name: String,
        field: String,
        target: String,
    },

    /// A rule body has the wrong shape
    #[error("Invalid rule on {type_name}: {reason}")]
    InvalidRule { type_name: String, reason: String },

    /// A custom statement field whose placeholders and arguments disagree
    #[error("Invalid statement field {type_name}.{field}: {reason}")]
    InvalidCypherField {
        type_name: String,
        field: String,
        reason: String,
    },
}

/// Translation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// A context reference could not be resolved and the rule does not allow
    /// unauthenticated callers
    #[error("Unauthenticated: {0}")]
    Authentication(String),

    /// A relationship rule compiled to no predicate
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Unknown type, field or operator, or an argument of the wrong shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The assembled statement could not be rendered
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type for schema loading
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for translation
pub type TranslateResult<T> = Result<T, TranslateError>;
