//! Authorization rules: model, resolution and compilation.
//!
//! Rules are resolved once at schema build time and compiled
//! per translation ([`AuthCompiler`]). This module also owns the placement
//! helpers that turn compiled predicates into statement guards.

mod compile;
mod context_ref;
mod resolve;
mod rule;

pub use compile::{AuthCompiler, CompileOptions};
pub use context_ref::{ContextReference, ContextSource};
pub(crate) use resolve::resolve_rules;
pub use rule::{AuthRule, Combinator, Operation, RuleBody, RuleEntry, RuleKind, RuleSection, RuleValue};

use graft_cypher::{not, Expr, Predicate};

/// `apoc.util.validatePredicate(NOT (p), "<message>", [0])`
///
/// The database raises `message` when `predicate` does not hold.
pub fn validate_predicate(predicate: Predicate, message: &str) -> Predicate {
    Predicate::Expr(Expr::call(
        "apoc.util.validatePredicate",
        vec![
            Expr::predicate(not(predicate)),
            Expr::literal(message),
            Expr::List(vec![Expr::literal(0)]),
        ],
    ))
}
