//! Boolean predicate algebra.
//!
//! The smart constructors ([`and`], [`or`], [`not`]) keep trees small:
//! singletons unwrap, nested combinators of the same kind flatten, and an
//! empty combinator is `None` rather than a node. Callers treat `None` as
//! "no constraint", which is what keeps an empty `or()` from ever filtering
//! out every row.

use crate::error::RenderError;
use crate::expr::Expr;
use crate::pattern::Pattern;
use crate::render::RenderContext;
use crate::variable::Variable;
use std::fmt;
use std::sync::Arc;

/// Binary comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

impl ComparisonOp {
    /// Operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Contains => "CONTAINS",
            ComparisonOp::StartsWith => "STARTS WITH",
            ComparisonOp::EndsWith => "ENDS WITH",
            ComparisonOp::Matches => "=~",
        }
    }
}

/// List predicate functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
    None,
    Single,
}

impl Quantifier {
    /// Function name.
    pub fn as_str(self) -> &'static str {
        match self {
            Quantifier::Any => "any",
            Quantifier::All => "all",
            Quantifier::None => "none",
            Quantifier::Single => "single",
        }
    }
}

/// `EXISTS { MATCH pattern WHERE predicate }`
#[derive(Clone, Debug)]
pub struct ExistsSubquery {
    /// Pattern whose existence is tested; unbound variables are local.
    pub pattern: Pattern,
    /// Optional filter on the local variables.
    pub predicate: Option<Predicate>,
}

/// Callback producing predicate text at render time.
pub type RawRender = dyn Fn(&mut RenderContext) -> Result<String, RenderError> + Send + Sync;

/// Raw predicate text produced by a callback, which may register parameters.
#[derive(Clone)]
pub struct RawPredicate {
    render: Arc<RawRender>,
    /// Variables the rendered text reads; sub-queries import them.
    pub references: Vec<Variable>,
}

impl RawPredicate {
    /// Wrap a render callback.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&mut RenderContext) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
            references: Vec::new(),
        }
    }

    /// Declare the variables the callback's text reads.
    pub fn referencing(mut self, variables: &[Variable]) -> Self {
        self.references.extend(variables.iter().cloned());
        self
    }

    pub(crate) fn render(&self, ctx: &mut RenderContext) -> Result<String, RenderError> {
        (self.render)(ctx)
    }
}

impl fmt::Debug for RawPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawPredicate(..)")
    }
}

/// A boolean expression scoped to pattern variables.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// `left op right`
    Comparison {
        left: Expr,
        op: ComparisonOp,
        right: Expr,
    },
    /// `value IN list`
    Membership { value: Expr, list: Expr },
    /// `expr IS NULL` / `expr IS NOT NULL`
    IsNull { expr: Expr, negated: bool },
    /// `EXISTS { ... }`
    Exists(Box<ExistsSubquery>),
    /// `any(variable IN list WHERE predicate)`
    Quantified {
        quantifier: Quantifier,
        variable: Variable,
        list: Expr,
        predicate: Box<Predicate>,
    },
    /// Conjunction; renders `true` when empty.
    And(Vec<Predicate>),
    /// Disjunction; renders `true` when empty, never `false`.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// `true` / `false`
    Literal(bool),
    /// A boolean-valued expression (e.g. a function call).
    Expr(Expr),
    /// Callback-rendered text.
    Raw(RawPredicate),
}

impl Predicate {
    /// Binding strength used to decide parenthesization. Higher binds tighter.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Predicate::Or(children) if children.len() > 1 => 1,
            Predicate::And(children) if children.len() > 1 => 2,
            Predicate::Or(children) | Predicate::And(children) if children.len() == 1 => {
                children[0].precedence()
            }
            Predicate::Not(_) => 3,
            _ => 4,
        }
    }
}

/// Conjunction of `children`, flattened; `None` when there is nothing to AND.
pub fn and<I>(children: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    let mut flat = Vec::new();
    for child in children {
        match child {
            Predicate::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(Predicate::And(flat)),
    }
}

/// Disjunction of `children`, flattened; `None` when there is nothing to OR.
pub fn or<I>(children: I) -> Option<Predicate>
where
    I: IntoIterator<Item = Predicate>,
{
    let mut flat = Vec::new();
    for child in children {
        match child {
            Predicate::Or(inner) if !inner.is_empty() => flat.extend(inner),
            Predicate::Or(_) => {}
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(Predicate::Or(flat)),
    }
}

/// Negation with double-negation removal.
pub fn not(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::Not(inner) => *inner,
        other => Predicate::Not(Box::new(other)),
    }
}

/// `left = right`
pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Predicate {
    compare(left, ComparisonOp::Eq, right)
}

/// `left op right`
pub fn compare(left: impl Into<Expr>, op: ComparisonOp, right: impl Into<Expr>) -> Predicate {
    Predicate::Comparison {
        left: left.into(),
        op,
        right: right.into(),
    }
}

/// `value IN list`
pub fn in_list(value: impl Into<Expr>, list: impl Into<Expr>) -> Predicate {
    Predicate::Membership {
        value: value.into(),
        list: list.into(),
    }
}

/// `expr IS NULL`
pub fn is_null(expr: impl Into<Expr>) -> Predicate {
    Predicate::IsNull {
        expr: expr.into(),
        negated: false,
    }
}

/// `expr IS NOT NULL`
pub fn is_not_null(expr: impl Into<Expr>) -> Predicate {
    Predicate::IsNull {
        expr: expr.into(),
        negated: true,
    }
}

/// `EXISTS { MATCH pattern [WHERE predicate] }`
pub fn exists(pattern: Pattern, predicate: Option<Predicate>) -> Predicate {
    Predicate::Exists(Box::new(ExistsSubquery { pattern, predicate }))
}

/// `quantifier(variable IN list WHERE predicate)`
pub fn quantified(
    quantifier: Quantifier,
    variable: &Variable,
    list: impl Into<Expr>,
    predicate: Predicate,
) -> Predicate {
    Predicate::Quantified {
        quantifier,
        variable: variable.clone(),
        list: list.into(),
        predicate: Box::new(predicate),
    }
}
