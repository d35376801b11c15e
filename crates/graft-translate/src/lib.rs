//! Selection and authorization-rule translation to Cypher
//!
//! This crate turns a resolved selection tree plus declarative auth rules
//! into one parameterized Cypher statement.
//!
//! ## Pipeline
//!
//! 1. A [`TypeRegistry`] is built once from [`NodeTypeDef`]s; rule bodies are
//!    resolved against it at build time
//! 2. [`Translator::translate`] compiles `where` filters ([`FilterCompiler`])
//!    and auth rules ([`AuthCompiler`]) into predicates over pattern variables
//! 3. Relationship, aggregate and custom statement fields become `CALL { }`
//!    sub-queries under a map projection of the root node
//! 4. The clause tree is rendered by `graft-cypher`, which names every
//!    parameter in order of first appearance
//!
//! ## Usage
//!
//! ```rust,no_run
//! use graft_config::GraftConfig;
//! use graft_translate::{RequestContext, SelectionNode, Translator, TypeRegistryBuilder};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = TypeRegistryBuilder::new()
//!     .add_json(json!([{
//!         "name": "Movie",
//!         "fields": [{"name": "title", "type": "String"}],
//!         "auth": [{"operations": ["READ"], "isAuthenticated": true}]
//!     }]))?
//!     .build()?;
//! let translator = Translator::new(Arc::new(registry), GraftConfig::default())?;
//!
//! let selection = SelectionNode::root("movies", "Movie").with_fields(["title"]);
//! let context = RequestContext::new().with_jwt(json!({"sub": "user-1"}));
//! let query = translator.translate(&selection, &context)?;
//! println!("{}\n{:?}", query.statement, query.parameters);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod coerce;
pub mod context;
pub mod error;
pub mod filter;
mod mutation;
mod projection;
pub mod schema;
pub mod selection;
mod translate;

// Re-exports
pub use auth::{
    validate_predicate, AuthCompiler, AuthRule, CompileOptions, ContextReference, ContextSource, Operation, RuleKind,
};
pub use coerce::{param_expr, CoercionError, DefaultCoercion, ScalarCoercion};
pub use context::RequestContext;
pub use error::{SchemaError, SchemaResult, TranslateError, TranslateResult};
pub use filter::FilterCompiler;
pub use schema::{
    Cardinality, CypherArgument, CypherField, NodeType, NodeTypeDef, RelationshipField, ScalarField, ScalarType, TypeRegistry,
    TypeRegistryBuilder,
};
pub use selection::{Options, SelectionNode};
pub use translate::{CypherQuery, Translator};
