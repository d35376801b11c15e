//! Cypher statement builder for graft
//!
//! This crate provides a small clause IR for read and write Cypher statements
//! and a renderer that turns it into text plus an ordered parameter map.
//!
//! ## Features
//!
//! - **Variables**: [`NameAuthority`] hands out collision-free names per translation
//! - **Parameters**: named in order of first appearance; unrendered ones never leak
//! - **Predicates**: flattening `and`/`or` constructors and precedence-aware rendering
//! - **Sub-queries**: `CALL { }` imports derived from what the body reads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use graft_cypher::{eq, CypherRenderer, Expr, Match, NodePattern, Param, Query, QueryRenderer, Return, Variable};
//!
//! let this = Variable::named("this");
//! let query = Query::new()
//!     .with(Match::new(NodePattern::new(&this).with_labels(["Movie"]))
//!         .filter(Some(eq(Expr::prop(&this, "title"), Param::new("Heat")))))
//!     .with(Return::single(Expr::var(&this), &this));
//!
//! let rendered = CypherRenderer::new().render(&query)?;
//! assert_eq!(rendered.cypher, "MATCH (this:Movie)\nWHERE this.title = $param0\nRETURN this");
//! ```

pub mod clause;
pub mod error;
pub mod expr;
pub mod literal;
pub mod param;
pub mod pattern;
pub mod placeholder;
pub mod predicate;
pub mod render;
pub mod variable;

// Re-exports
pub use clause::{
    Call, Clause, Create, Delete, Match, ProjectionItem, Query, RawClause, Return, Set, SetItem, SortDirection,
    SortItem, Unwind, With,
};
pub use error::{RenderError, RenderResult};
pub use expr::{Expr, FunctionCall, MapProjection, MapProjectionItem, PatternComprehension};
pub use literal::Literal;
pub use param::{Param, ParamRegistry};
pub use pattern::{Direction, NodePattern, Pattern, RelationshipPattern};
pub use predicate::{
    and, compare, eq, exists, in_list, is_not_null, is_null, not, or, quantified, ComparisonOp, ExistsSubquery,
    Predicate, Quantifier, RawPredicate,
};
pub use render::{CypherRenderer, QueryRenderer, RenderContext, RenderedQuery};
pub use variable::{NameAuthority, Variable};
