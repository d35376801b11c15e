//! Value expressions: properties, parameters, literals, maps and calls.

use crate::literal::Literal;
use crate::param::Param;
use crate::pattern::Pattern;
use crate::predicate::Predicate;
use crate::variable::Variable;

/// Any value-producing Cypher expression.
#[derive(Clone, Debug)]
pub enum Expr {
    /// A bound variable.
    Variable(Variable),
    /// `base.key`
    Property(Box<Expr>, String),
    /// `$name`
    Param(Param),
    /// Inline literal text.
    Literal(Literal),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `{ key: value }`
    Map(Vec<(String, Expr)>),
    /// `var { .key, alias: expr }`
    MapProjection(MapProjection),
    /// `name(args)`
    Function(FunctionCall),
    /// `[pattern WHERE predicate | projection]`
    PatternComprehension(Box<PatternComprehension>),
    /// A boolean predicate used as a value (e.g. a function argument).
    Predicate(Box<Predicate>),
}

impl Expr {
    /// Reference a variable.
    pub fn var(variable: &Variable) -> Self {
        Expr::Variable(variable.clone())
    }

    /// `variable.key`
    pub fn prop(variable: &Variable, key: impl Into<String>) -> Self {
        Expr::Property(Box::new(Expr::var(variable)), key.into())
    }

    /// Wrap a parameter.
    pub fn param(param: Param) -> Self {
        Expr::Param(param)
    }

    /// Wrap an inline literal.
    pub fn literal(value: impl Into<Literal>) -> Self {
        Expr::Literal(value.into())
    }

    /// `self.key`
    pub fn property(self, key: impl Into<String>) -> Self {
        Expr::Property(Box::new(self), key.into())
    }

    /// `name(args)`
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall {
            name: name.into(),
            args,
            distinct: false,
        })
    }

    /// `collect(expr)`
    pub fn collect(expr: Expr) -> Self {
        Expr::call("collect", vec![expr])
    }

    /// `head(expr)`
    pub fn head(expr: Expr) -> Self {
        Expr::call("head", vec![expr])
    }

    /// `count(expr)`
    pub fn count(expr: Expr) -> Self {
        Expr::call("count", vec![expr])
    }

    /// `size(expr)`
    pub fn size(expr: Expr) -> Self {
        Expr::call("size", vec![expr])
    }

    /// A predicate in value position.
    pub fn predicate(predicate: Predicate) -> Self {
        Expr::Predicate(Box::new(predicate))
    }
}

impl From<Variable> for Expr {
    fn from(variable: Variable) -> Self {
        Expr::Variable(variable)
    }
}

impl From<&Variable> for Expr {
    fn from(variable: &Variable) -> Self {
        Expr::Variable(variable.clone())
    }
}

impl From<Param> for Expr {
    fn from(param: Param) -> Self {
        Expr::Param(param)
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Expr::Literal(literal)
    }
}

impl From<MapProjection> for Expr {
    fn from(projection: MapProjection) -> Self {
        Expr::MapProjection(projection)
    }
}

/// `variable { .a, b: expr }`
#[derive(Clone, Debug)]
pub struct MapProjection {
    /// Projected variable.
    pub variable: Variable,
    /// Projection items in output order.
    pub items: Vec<MapProjectionItem>,
}

impl MapProjection {
    /// An empty projection of `variable`.
    pub fn new(variable: &Variable) -> Self {
        Self {
            variable: variable.clone(),
            items: Vec::new(),
        }
    }

    /// Add a `.key` item.
    pub fn property(mut self, key: impl Into<String>) -> Self {
        self.items.push(MapProjectionItem::Property(key.into()));
        self
    }

    /// Add a `key: expr` item.
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.items.push(MapProjectionItem::Entry(key.into(), value.into()));
        self
    }
}

/// One entry of a map projection.
#[derive(Clone, Debug)]
pub enum MapProjectionItem {
    /// `.key` shorthand.
    Property(String),
    /// `key: expr`
    Entry(String, Expr),
}

/// Function invocation.
#[derive(Clone, Debug)]
pub struct FunctionCall {
    /// Possibly namespaced name (`apoc.util.validatePredicate`).
    pub name: String,
    /// Arguments.
    pub args: Vec<Expr>,
    /// Renders `name(DISTINCT ...)`.
    pub distinct: bool,
}

/// `[pattern WHERE predicate | projection]`
#[derive(Clone, Debug)]
pub struct PatternComprehension {
    /// Matched pattern; unbound variables are local to the comprehension.
    pub pattern: Pattern,
    /// Optional filter.
    pub predicate: Option<Predicate>,
    /// Value collected per match.
    pub projection: Expr,
}
