//! Clause IR: the ordered statement a translation assembles.

use crate::expr::Expr;
use crate::param::Param;
use crate::pattern::Pattern;
use crate::predicate::Predicate;
use crate::variable::Variable;

/// An ordered list of clauses; either a whole statement or a `CALL { }` body.
#[derive(Clone, Debug, Default)]
pub struct Query {
    /// Clauses in execution order.
    pub clauses: Vec<Clause>,
}

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause.
    pub fn push(&mut self, clause: impl Into<Clause>) {
        self.clauses.push(clause.into());
    }

    /// Builder-style append.
    pub fn with(mut self, clause: impl Into<Clause>) -> Self {
        self.push(clause);
        self
    }

    /// Append every clause of `other`.
    pub fn extend(&mut self, other: Query) {
        self.clauses.extend(other.clauses);
    }

    /// Whether the query has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Names a `CALL` over this body adds to the enclosing scope.
    pub fn outputs(&self) -> Vec<Variable> {
        match self.clauses.last() {
            Some(Clause::Return(ret)) => ret.items.iter().filter_map(ProjectionItem::binding).collect(),
            Some(Clause::Raw(raw)) => raw.outputs.clone(),
            _ => Vec::new(),
        }
    }
}

/// One Cypher clause.
#[derive(Clone, Debug)]
pub enum Clause {
    Match(Match),
    Create(Create),
    Set(Set),
    With(With),
    Unwind(Unwind),
    Call(Call),
    Raw(RawClause),
    Delete(Delete),
    Return(Return),
}

/// `[OPTIONAL] MATCH pattern [WHERE predicate]`
#[derive(Clone, Debug)]
pub struct Match {
    pub pattern: Pattern,
    pub optional: bool,
    pub predicate: Option<Predicate>,
}

impl Match {
    /// A plain MATCH.
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            optional: false,
            predicate: None,
        }
    }

    /// Attach a WHERE predicate (`None` leaves the match unfiltered).
    pub fn filter(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Make this an OPTIONAL MATCH.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// `CREATE pattern`
#[derive(Clone, Debug)]
pub struct Create {
    pub pattern: Pattern,
}

/// `SET target = value, ...`
#[derive(Clone, Debug, Default)]
pub struct Set {
    pub items: Vec<SetItem>,
}

/// One assignment in a SET clause.
#[derive(Clone, Debug)]
pub struct SetItem {
    pub target: Expr,
    pub value: Expr,
}

/// `expr [AS alias]`
#[derive(Clone, Debug)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub alias: Option<Variable>,
}

impl ProjectionItem {
    /// `expr AS alias`
    pub fn aliased(expr: impl Into<Expr>, alias: &Variable) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.clone()),
        }
    }

    /// Bare variable projection.
    pub fn variable(variable: &Variable) -> Self {
        Self {
            expr: Expr::var(variable),
            alias: None,
        }
    }

    /// Name this item is visible under after the clause.
    pub fn binding(&self) -> Option<Variable> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias.clone()),
            (None, Expr::Variable(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// `expr ASC|DESC`
#[derive(Clone, Debug)]
pub struct SortItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// `WITH * ...` or `WITH items ...`
#[derive(Clone, Debug)]
pub struct With {
    /// `None` renders `*` and keeps the whole scope.
    pub items: Option<Vec<ProjectionItem>>,
    pub distinct: bool,
    pub order_by: Vec<SortItem>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
    pub predicate: Option<Predicate>,
}

impl With {
    /// `WITH *`
    pub fn star() -> Self {
        Self {
            items: None,
            distinct: false,
            order_by: Vec::new(),
            skip: None,
            limit: None,
            predicate: None,
        }
    }

    /// `WITH items`
    pub fn items(items: Vec<ProjectionItem>) -> Self {
        Self {
            items: Some(items),
            ..Self::star()
        }
    }

    /// Attach a WHERE predicate.
    pub fn filter(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }
}

/// `UNWIND expr AS alias`
#[derive(Clone, Debug)]
pub struct Unwind {
    pub expr: Expr,
    pub alias: Variable,
}

/// `CALL { body }`
///
/// The importing `WITH` is not part of the IR: the renderer derives it from
/// the variables the body references.
#[derive(Clone, Debug)]
pub struct Call {
    pub body: Query,
    /// Prefix for parameters first registered inside the body.
    pub param_scope: Option<String>,
}

impl Call {
    /// A sub-query without a parameter scope.
    pub fn new(body: Query) -> Self {
        Self {
            body,
            param_scope: None,
        }
    }

    /// Prefix parameters registered inside the body with `scope`.
    pub fn scoped(body: Query, scope: impl Into<String>) -> Self {
        Self {
            body,
            param_scope: Some(scope.into()),
        }
    }
}

/// Statement text supplied from outside the builder (custom field statements).
#[derive(Clone, Debug, Default)]
pub struct RawClause {
    pub text: String,
    /// Parameters keyed by the placeholder name the text uses. Each `$name`
    /// is rewritten to the parameter's registered name; entries the text
    /// never mentions are not registered.
    pub params: Vec<(String, Param)>,
    /// Variables the text reads from the enclosing scope.
    pub references: Vec<Variable>,
    /// Variables the text leaves bound (its RETURN columns).
    pub outputs: Vec<Variable>,
}

impl RawClause {
    /// The parameter bound to `$placeholder`.
    pub fn param(&self, placeholder: &str) -> Option<&Param> {
        self.params
            .iter()
            .find(|(name, _)| name == placeholder)
            .map(|(_, param)| param)
    }
}

/// `[DETACH] DELETE targets`
#[derive(Clone, Debug)]
pub struct Delete {
    pub targets: Vec<Variable>,
    pub detach: bool,
}

/// `RETURN items ...`
#[derive(Clone, Debug, Default)]
pub struct Return {
    pub items: Vec<ProjectionItem>,
    pub distinct: bool,
    pub order_by: Vec<SortItem>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
}

impl Return {
    /// `RETURN expr AS alias`
    pub fn single(expr: impl Into<Expr>, alias: &Variable) -> Self {
        Self {
            items: vec![ProjectionItem::aliased(expr, alias)],
            ..Default::default()
        }
    }
}

macro_rules! impl_into_clause {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Clause {
                fn from(value: $ty) -> Self {
                    Clause::$ty(value)
                }
            }
        )*
    };
}

impl_into_clause!(Match, Create, Set, With, Unwind, Call, Delete, Return);

impl From<RawClause> for Clause {
    fn from(value: RawClause) -> Self {
        Clause::Raw(value)
    }
}
