//! Rendering of the clause IR to Cypher text and a parameter map.
//!
//! Rendering walks the IR in textual order. Parameters are named as they are
//! first written, variables are checked against the scope that is visible at
//! the point they are written, and `CALL { }` imports are derived from what a
//! body actually reads.

mod scope;

use crate::clause::{
    Call, Clause, Delete, Match, ProjectionItem, Query, RawClause, Return, SetItem, SortDirection, SortItem, With,
};
use crate::error::RenderError;
use crate::expr::{Expr, MapProjection, MapProjectionItem, PatternComprehension};
use crate::literal::escape_identifier;
use crate::param::{Param, ParamRegistry};
use crate::pattern::{Direction, NodePattern, Pattern, RelationshipPattern};
use crate::placeholder;
use crate::predicate::{ExistsSubquery, Predicate};
use crate::variable::Variable;
use indexmap::IndexMap;
use scope::Scope;
use serde_json::Value;
use tracing::{debug, trace};

/// Output from rendering
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    /// The generated statement
    pub cypher: String,
    /// Parameters to bind, in order of first appearance
    pub params: IndexMap<String, Value>,
}

/// Trait for rendering the clause IR to a query language.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the IR to a query string with parameters
    fn render(&self, query: &Query) -> Result<RenderedQuery, RenderError>;
}

/// Renders Cypher with `CALL { }` bodies indented by a fixed width.
#[derive(Debug, Clone)]
pub struct CypherRenderer {
    indent: usize,
}

impl Default for CypherRenderer {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

impl CypherRenderer {
    /// Renderer with the default four-space indent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with a custom indent width.
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }
}

impl QueryRenderer for CypherRenderer {
    fn name(&self) -> &str {
        "cypher"
    }

    fn render(&self, query: &Query) -> Result<RenderedQuery, RenderError> {
        let mut ctx = RenderContext::new(self.indent);
        let lines = ctx.query(query)?;
        let cypher = lines.join("\n");
        let params = ctx.params.into_params();

        debug!(params = params.len(), lines = lines.len(), "rendered cypher statement");
        trace!(%cypher, "cypher text");

        Ok(RenderedQuery { cypher, params })
    }
}

/// How unbound pattern variables are treated.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// MATCH/CREATE: new variables join the statement scope.
    Scope,
    /// EXISTS and pattern comprehensions: new variables are local.
    Local,
}

/// Mutable state for one render pass.
///
/// Raw callbacks receive the context so that the text they produce goes
/// through the same parameter registry and scope checks as the IR.
pub struct RenderContext {
    params: ParamRegistry,
    scope: Scope,
    locals: Vec<String>,
    param_scopes: Vec<String>,
    indent: usize,
}

impl RenderContext {
    fn new(indent: usize) -> Self {
        Self {
            params: ParamRegistry::new(),
            scope: Scope::default(),
            locals: Vec::new(),
            param_scopes: Vec::new(),
            indent,
        }
    }

    /// Whether `variable` may be referenced here.
    pub fn is_bound(&self, variable: &Variable) -> bool {
        self.is_visible(variable.name())
    }

    fn is_visible(&self, name: &str) -> bool {
        self.scope.contains(name) || self.locals.iter().any(|l| l == name)
    }

    /// Name of a bound variable.
    pub fn variable(&self, variable: &Variable) -> Result<String, RenderError> {
        if !self.is_bound(variable) {
            return Err(RenderError::UnboundVariable {
                name: variable.name().to_string(),
            });
        }
        Ok(escape_identifier(variable.name()).into_owned())
    }

    /// Register `param` and return its placeholder.
    pub fn param(&mut self, param: &Param) -> Result<String, RenderError> {
        let scope = self.param_scopes.last().map(String::as_str);
        let name = self.params.register(param, scope)?;
        Ok(ParamRegistry::placeholder(&name))
    }

    /// Render an expression.
    pub fn expr(&mut self, expr: &Expr) -> Result<String, RenderError> {
        match expr {
            Expr::Variable(v) => self.variable(v),
            Expr::Property(base, key) => {
                let base = self.expr(base)?;
                Ok(format!("{base}.{}", escape_identifier(key)))
            }
            Expr::Param(param) => self.param(param),
            Expr::Literal(literal) => Ok(literal.to_cypher()),
            Expr::List(items) => {
                let items = self.exprs(items)?;
                Ok(format!("[{}]", items.join(", ")))
            }
            Expr::Map(entries) => self.map(entries),
            Expr::MapProjection(projection) => self.map_projection(projection),
            Expr::Function(call) => {
                let args = self.exprs(&call.args)?;
                let distinct = if call.distinct { "DISTINCT " } else { "" };
                Ok(format!("{}({distinct}{})", call.name, args.join(", ")))
            }
            Expr::PatternComprehension(comprehension) => {
                let mark = self.locals.len();
                let result = self.comprehension(comprehension);
                self.locals.truncate(mark);
                result
            }
            Expr::Predicate(p) => self.predicate(p),
        }
    }

    fn comprehension(&mut self, comprehension: &PatternComprehension) -> Result<String, RenderError> {
        let pattern = self.pattern(&comprehension.pattern, Binding::Local)?;
        let filter = match &comprehension.predicate {
            Some(p) => format!(" WHERE {}", self.predicate(p)?),
            None => String::new(),
        };
        let projection = self.expr(&comprehension.projection)?;
        Ok(format!("[{pattern}{filter} | {projection}]"))
    }

    fn exists(&mut self, exists: &ExistsSubquery) -> Result<String, RenderError> {
        let pattern = self.pattern(&exists.pattern, Binding::Local)?;
        Ok(match &exists.predicate {
            Some(p) => format!("EXISTS {{ MATCH {pattern} WHERE {} }}", self.predicate(p)?),
            None => format!("EXISTS {{ MATCH {pattern} }}"),
        })
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<Vec<String>, RenderError> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn map(&mut self, entries: &[(String, Expr)]) -> Result<String, RenderError> {
        if entries.is_empty() {
            return Ok("{}".to_string());
        }
        let mut rendered = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            rendered.push(format!("{}: {}", escape_identifier(key), self.expr(value)?));
        }
        Ok(format!("{{ {} }}", rendered.join(", ")))
    }

    fn map_projection(&mut self, projection: &MapProjection) -> Result<String, RenderError> {
        let variable = self.variable(&projection.variable)?;
        if projection.items.is_empty() {
            return Ok(format!("{variable} {{}}"));
        }
        let mut items = Vec::with_capacity(projection.items.len());
        for item in &projection.items {
            items.push(match item {
                MapProjectionItem::Property(key) => format!(".{}", escape_identifier(key)),
                MapProjectionItem::Entry(key, value) => {
                    format!("{}: {}", escape_identifier(key), self.expr(value)?)
                }
            });
        }
        Ok(format!("{variable} {{ {} }}", items.join(", ")))
    }

    /// Render a predicate.
    pub fn predicate(&mut self, predicate: &Predicate) -> Result<String, RenderError> {
        match predicate {
            Predicate::Comparison { left, op, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                Ok(format!("{left} {} {right}", op.as_str()))
            }
            Predicate::Membership { value, list } => {
                let value = self.expr(value)?;
                let list = self.expr(list)?;
                Ok(format!("{value} IN {list}"))
            }
            Predicate::IsNull { expr, negated } => {
                let expr = self.expr(expr)?;
                Ok(if *negated {
                    format!("{expr} IS NOT NULL")
                } else {
                    format!("{expr} IS NULL")
                })
            }
            Predicate::Exists(exists) => {
                let mark = self.locals.len();
                let result = self.exists(exists);
                self.locals.truncate(mark);
                result
            }
            Predicate::Quantified {
                quantifier,
                variable,
                list,
                predicate,
            } => {
                let list = self.expr(list)?;
                self.locals.push(variable.name().to_string());
                let inner = self.predicate(predicate);
                self.locals.pop();
                Ok(format!(
                    "{}({} IN {list} WHERE {})",
                    quantifier.as_str(),
                    escape_identifier(variable.name()),
                    inner?
                ))
            }
            Predicate::And(children) => self.junction(children, " AND ", 2),
            Predicate::Or(children) => self.junction(children, " OR ", 1),
            Predicate::Not(inner) => Ok(format!("NOT ({})", self.predicate(inner)?)),
            Predicate::Literal(value) => Ok(value.to_string()),
            Predicate::Expr(expr) => self.expr(expr),
            Predicate::Raw(raw) => {
                for variable in &raw.references {
                    self.variable(variable)?;
                }
                raw.render(self)
            }
        }
    }

    fn junction(&mut self, children: &[Predicate], separator: &str, strength: u8) -> Result<String, RenderError> {
        match children {
            [] => Ok("true".to_string()),
            [only] => self.predicate(only),
            _ => {
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    let text = self.predicate(child)?;
                    if child.precedence() < strength {
                        parts.push(format!("({text})"));
                    } else {
                        parts.push(text);
                    }
                }
                Ok(parts.join(separator))
            }
        }
    }

    fn pattern(&mut self, pattern: &Pattern, binding: Binding) -> Result<String, RenderError> {
        let mut out = self.node(&pattern.start, binding)?;
        for (relationship, node) in &pattern.hops {
            out.push_str(&self.relationship(relationship, binding)?);
            out.push_str(&self.node(node, binding)?);
        }
        Ok(out)
    }

    fn declare(&mut self, variable: &Variable, binding: Binding) -> String {
        if !self.is_bound(variable) {
            match binding {
                Binding::Scope => self.scope.bind(variable),
                Binding::Local => self.locals.push(variable.name().to_string()),
            }
        }
        escape_identifier(variable.name()).into_owned()
    }

    fn node(&mut self, node: &NodePattern, binding: Binding) -> Result<String, RenderError> {
        let mut inner = match &node.variable {
            Some(v) => self.declare(v, binding),
            None => String::new(),
        };
        for label in &node.labels {
            inner.push(':');
            inner.push_str(&escape_identifier(label));
        }
        if !node.properties.is_empty() {
            let map = self.map(&node.properties)?;
            if !inner.is_empty() {
                inner.push(' ');
            }
            inner.push_str(&map);
        }
        Ok(format!("({inner})"))
    }

    fn relationship(&mut self, relationship: &RelationshipPattern, binding: Binding) -> Result<String, RenderError> {
        let mut inner = match &relationship.variable {
            Some(v) => self.declare(v, binding),
            None => String::new(),
        };
        if !relationship.types.is_empty() {
            let types: Vec<_> = relationship.types.iter().map(|t| escape_identifier(t)).collect();
            inner.push(':');
            inner.push_str(&types.join("|"));
        }
        if !relationship.properties.is_empty() {
            let map = self.map(&relationship.properties)?;
            if !inner.is_empty() {
                inner.push(' ');
            }
            inner.push_str(&map);
        }
        let body = if inner.is_empty() { String::new() } else { format!("[{inner}]") };
        Ok(match relationship.direction {
            Direction::Out => format!("-{body}->"),
            Direction::In => format!("<-{body}-"),
            Direction::Undirected => format!("-{body}-"),
        })
    }

    fn query(&mut self, query: &Query) -> Result<Vec<String>, RenderError> {
        let mut lines = Vec::new();
        for clause in &query.clauses {
            lines.extend(self.clause(clause)?);
        }
        Ok(lines)
    }

    fn clause(&mut self, clause: &Clause) -> Result<Vec<String>, RenderError> {
        match clause {
            Clause::Match(m) => self.match_clause(m),
            Clause::Create(create) => Ok(vec![format!("CREATE {}", self.pattern(&create.pattern, Binding::Scope)?)]),
            Clause::Set(set) => self.set(&set.items),
            Clause::With(with) => self.with(with),
            Clause::Unwind(unwind) => {
                let expr = self.expr(&unwind.expr)?;
                self.scope.bind(&unwind.alias);
                Ok(vec![format!("UNWIND {expr} AS {}", escape_identifier(unwind.alias.name()))])
            }
            Clause::Call(call) => self.call(call),
            Clause::Raw(raw) => self.raw(raw),
            Clause::Delete(delete) => self.delete(delete),
            Clause::Return(ret) => self.return_clause(ret),
        }
    }

    fn match_clause(&mut self, m: &Match) -> Result<Vec<String>, RenderError> {
        let keyword = if m.optional { "OPTIONAL MATCH" } else { "MATCH" };
        let mut lines = vec![format!("{keyword} {}", self.pattern(&m.pattern, Binding::Scope)?)];
        if let Some(p) = &m.predicate {
            lines.push(format!("WHERE {}", self.predicate(p)?));
        }
        Ok(lines)
    }

    fn set(&mut self, items: &[SetItem]) -> Result<Vec<String>, RenderError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut assignments = Vec::with_capacity(items.len());
        for item in items {
            let target = self.expr(&item.target)?;
            let value = self.expr(&item.value)?;
            assignments.push(format!("{target} = {value}"));
        }
        Ok(vec![format!("SET {}", assignments.join(", "))])
    }

    fn projection(&mut self, items: &[ProjectionItem]) -> Result<String, RenderError> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            let expr = self.expr(&item.expr)?;
            rendered.push(match (&item.alias, &item.expr) {
                (Some(alias), Expr::Variable(v)) if v == alias => expr,
                (Some(alias), _) => format!("{expr} AS {}", escape_identifier(alias.name())),
                (None, _) => expr,
            });
        }
        Ok(rendered.join(", "))
    }

    fn sort_and_page(
        &mut self,
        order_by: &[SortItem],
        skip: Option<&Expr>,
        limit: Option<&Expr>,
    ) -> Result<Vec<String>, RenderError> {
        let mut lines = Vec::new();
        if !order_by.is_empty() {
            let mut sorts = Vec::with_capacity(order_by.len());
            for sort in order_by {
                let direction = match sort.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                sorts.push(format!("{} {direction}", self.expr(&sort.expr)?));
            }
            lines.push(format!("ORDER BY {}", sorts.join(", ")));
        }
        if let Some(skip) = skip {
            lines.push(format!("SKIP {}", self.expr(skip)?));
        }
        if let Some(limit) = limit {
            lines.push(format!("LIMIT {}", self.expr(limit)?));
        }
        Ok(lines)
    }

    fn with(&mut self, with: &With) -> Result<Vec<String>, RenderError> {
        let distinct = if with.distinct { "DISTINCT " } else { "" };
        let (head, projected) = match &with.items {
            None => (format!("WITH {distinct}*"), None),
            Some(items) => {
                let text = self.projection(items)?;
                let bindings: Vec<_> = items.iter().filter_map(ProjectionItem::binding).collect();
                (format!("WITH {distinct}{text}"), Some(bindings))
            }
        };

        // ORDER BY and WHERE see both the incoming names and the projected ones.
        if let Some(bindings) = &projected {
            bindings.iter().for_each(|b| self.scope.bind(b));
        }
        let mut lines = vec![head];
        lines.extend(self.sort_and_page(&with.order_by, with.skip.as_ref(), with.limit.as_ref())?);
        if let Some(p) = &with.predicate {
            lines.push(format!("WHERE {}", self.predicate(p)?));
        }

        if let Some(bindings) = projected {
            self.scope = Scope::from_names(bindings.iter().map(|b| b.name().to_string()));
        }
        Ok(lines)
    }

    fn call(&mut self, call: &Call) -> Result<Vec<String>, RenderError> {
        let referenced = scope::referenced(&call.body);
        let imports: Vec<String> = self.scope.iter().filter(|name| referenced.contains(*name)).cloned().collect();

        let outer = std::mem::replace(&mut self.scope, Scope::from_names(imports.clone()));
        if let Some(prefix) = &call.param_scope {
            self.param_scopes.push(prefix.clone());
        }
        let body = self.query(&call.body);
        if call.param_scope.is_some() {
            self.param_scopes.pop();
        }
        self.scope = outer;
        let body = body?;

        let pad = " ".repeat(self.indent);
        let mut lines = vec!["CALL {".to_string()];
        if !imports.is_empty() {
            let names: Vec<_> = imports.iter().map(|n| escape_identifier(n)).collect();
            lines.push(format!("{pad}WITH {}", names.join(", ")));
        }
        lines.extend(body.into_iter().map(|line| format!("{pad}{line}")));
        lines.push("}".to_string());

        for output in call.body.outputs() {
            self.scope.bind(&output);
        }
        Ok(lines)
    }

    fn raw(&mut self, raw: &RawClause) -> Result<Vec<String>, RenderError> {
        for variable in &raw.references {
            self.variable(variable)?;
        }
        let text = placeholder::rewrite(&raw.text, |name| match raw.param(name) {
            Some(param) => self.param(param),
            None => Err(RenderError::UnboundParam { name: name.to_string() }),
        })?;
        for output in &raw.outputs {
            self.scope.bind(output);
        }
        Ok(text.lines().map(str::to_string).collect())
    }

    fn delete(&mut self, delete: &Delete) -> Result<Vec<String>, RenderError> {
        let mut targets = Vec::with_capacity(delete.targets.len());
        for target in &delete.targets {
            targets.push(self.variable(target)?);
        }
        let keyword = if delete.detach { "DETACH DELETE" } else { "DELETE" };
        Ok(vec![format!("{keyword} {}", targets.join(", "))])
    }

    fn return_clause(&mut self, ret: &Return) -> Result<Vec<String>, RenderError> {
        let distinct = if ret.distinct { "DISTINCT " } else { "" };
        let text = self.projection(&ret.items)?;
        let bindings: Vec<_> = ret.items.iter().filter_map(ProjectionItem::binding).collect();
        bindings.iter().for_each(|b| self.scope.bind(b));

        let mut lines = vec![format!("RETURN {distinct}{text}")];
        lines.extend(self.sort_and_page(&ret.order_by, ret.skip.as_ref(), ret.limit.as_ref())?);

        self.scope = Scope::from_names(bindings.iter().map(|b| b.name().to_string()));
        Ok(lines)
    }
}
