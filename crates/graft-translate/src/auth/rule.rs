//! Resolved authorization rules.

use super::context_ref::ContextReference;
use crate::schema::ScalarType;
use graft_cypher::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Connect,
    Disconnect,
}

/// Which section of a rule is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Checked against existing data before the operation.
    Allow,
    /// Checked against the data the operation leaves behind.
    Bind,
    /// Silently narrows the matched nodes.
    Where,
}

/// One permission clause attached to a type or field.
#[derive(Debug, Clone, Default)]
pub struct AuthRule {
    /// `None` applies the rule to every operation.
    pub operations: Option<Vec<Operation>>,
    pub roles: Option<Vec<String>>,
    pub is_authenticated: Option<bool>,
    pub allow: Option<RuleSection>,
    pub bind: Option<RuleSection>,
    pub filter: Option<RuleSection>,
    pub and: Vec<AuthRule>,
    pub or: Vec<AuthRule>,
    /// Unresolved context references bind `null` instead of failing.
    pub allow_unauthenticated: bool,
}

impl AuthRule {
    /// Whether the rule takes part in `operation`.
    pub fn applies_to(&self, operation: Operation) -> bool {
        self.operations.as_ref().map_or(true, |ops| ops.contains(&operation))
    }

    /// The section compiled for `kind`.
    pub fn section(&self, kind: RuleKind) -> Option<&RuleSection> {
        match kind {
            RuleKind::Allow => self.allow.as_ref(),
            RuleKind::Bind => self.bind.as_ref(),
            RuleKind::Where => self.filter.as_ref(),
        }
    }
}

/// Body of an allow/bind/where section.
#[derive(Debug, Clone)]
pub enum RuleSection {
    /// `"*"`: no constraint on the data.
    Any,
    Body(RuleBody),
}

/// Ordered entries of a rule body; entries are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct RuleBody {
    pub entries: Vec<RuleEntry>,
}

/// AND/OR inside a rule body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// One resolved key of a rule body.
#[derive(Debug, Clone)]
pub enum RuleEntry {
    /// `AND: [...]` / `OR: [...]`
    Combinator { op: Combinator, bodies: Vec<RuleBody> },
    /// `field: value`
    Scalar {
        field: String,
        property: String,
        ty: ScalarType,
        value: RuleValue,
    },
    /// `relationship: { ... }`, with the body resolved against the target.
    Relationship {
        field: String,
        rel_type: String,
        direction: Direction,
        target_labels: Vec<String>,
        body: RuleBody,
    },
}

/// Right-hand side of a scalar entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Literal(Value),
    Context(ContextReference),
}
