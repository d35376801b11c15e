//! Variable scope tracking and reference collection for sub-query imports.

use crate::clause::{Clause, ProjectionItem, Query};
use crate::expr::{Expr, MapProjectionItem};
use crate::pattern::Pattern;
use crate::predicate::Predicate;
use crate::variable::Variable;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Names visible at a point of the statement, in binding order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    names: IndexSet<String>,
}

impl Scope {
    pub(crate) fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub(crate) fn bind(&mut self, variable: &Variable) {
        self.names.insert(variable.name().to_string());
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }
}

/// Every variable name a query mentions as a reference, including inside
/// nested sub-queries. Aliases introduced by WITH/RETURN/UNWIND are bindings,
/// not references, and a name read after the body itself bound it is local.
pub(crate) fn referenced(query: &Query) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_query(query, &mut names, &HashSet::new());
    names
}

fn collect_query(query: &Query, names: &mut HashSet<String>, outer_bound: &HashSet<String>) {
    let mut bound = outer_bound.clone();
    for clause in &query.clauses {
        let mut found = HashSet::new();
        collect_clause(clause, &mut found, &bound);
        names.extend(found.into_iter().filter(|name| !bound.contains(name)));
        bound.extend(bindings(clause).into_iter().map(|v| v.name().to_string()));
    }
}

/// Names a clause introduces by aliasing, which shadow outer names afterwards.
fn bindings(clause: &Clause) -> Vec<Variable> {
    match clause {
        Clause::With(with) => with
            .items
            .iter()
            .flatten()
            .filter_map(|item| item.alias.clone())
            .collect(),
        Clause::Unwind(unwind) => vec![unwind.alias.clone()],
        Clause::Call(call) => call.body.outputs(),
        Clause::Raw(raw) => raw.outputs.clone(),
        Clause::Return(ret) => ret.items.iter().filter_map(|item| item.alias.clone()).collect(),
        _ => Vec::new(),
    }
}

fn collect_clause(clause: &Clause, names: &mut HashSet<String>, bound: &HashSet<String>) {
    match clause {
        Clause::Match(m) => {
            collect_pattern(&m.pattern, names);
            if let Some(p) = &m.predicate {
                collect_predicate(p, names);
            }
        }
        Clause::Create(c) => collect_pattern(&c.pattern, names),
        Clause::Set(set) => {
            for item in &set.items {
                collect_expr(&item.target, names);
                collect_expr(&item.value, names);
            }
        }
        Clause::With(with) => {
            if let Some(items) = &with.items {
                collect_items(items, names);
            }
            for sort in &with.order_by {
                collect_expr(&sort.expr, names);
            }
            with.skip.iter().chain(with.limit.iter()).for_each(|e| collect_expr(e, names));
            if let Some(p) = &with.predicate {
                collect_predicate(p, names);
            }
        }
        Clause::Unwind(unwind) => collect_expr(&unwind.expr, names),
        Clause::Call(call) => collect_query(&call.body, names, bound),
        Clause::Raw(raw) => {
            names.extend(raw.references.iter().map(|v| v.name().to_string()));
        }
        Clause::Delete(delete) => {
            names.extend(delete.targets.iter().map(|v| v.name().to_string()));
        }
        Clause::Return(ret) => {
            collect_items(&ret.items, names);
            for sort in &ret.order_by {
                collect_expr(&sort.expr, names);
            }
            ret.skip.iter().chain(ret.limit.iter()).for_each(|e| collect_expr(e, names));
        }
    }
}

fn collect_items(items: &[ProjectionItem], names: &mut HashSet<String>) {
    for item in items {
        collect_expr(&item.expr, names);
    }
}

fn collect_pattern(pattern: &Pattern, names: &mut HashSet<String>) {
    names.extend(pattern.variables().into_iter().map(|v| v.name().to_string()));
    for expr in pattern.property_exprs() {
        collect_expr(expr, names);
    }
}

fn collect_expr(expr: &Expr, names: &mut HashSet<String>) {
    match expr {
        Expr::Variable(v) => {
            names.insert(v.name().to_string());
        }
        Expr::Property(base, _) => collect_expr(base, names),
        Expr::Param(_) | Expr::Literal(_) => {}
        Expr::List(items) => items.iter().for_each(|e| collect_expr(e, names)),
        Expr::Map(entries) => entries.iter().for_each(|(_, e)| collect_expr(e, names)),
        Expr::MapProjection(projection) => {
            names.insert(projection.variable.name().to_string());
            for item in &projection.items {
                if let MapProjectionItem::Entry(_, e) = item {
                    collect_expr(e, names);
                }
            }
        }
        Expr::Function(call) => call.args.iter().for_each(|e| collect_expr(e, names)),
        Expr::PatternComprehension(comprehension) => {
            collect_pattern(&comprehension.pattern, names);
            if let Some(p) = &comprehension.predicate {
                collect_predicate(p, names);
            }
            collect_expr(&comprehension.projection, names);
        }
        Expr::Predicate(p) => collect_predicate(p, names),
    }
}

fn collect_predicate(predicate: &Predicate, names: &mut HashSet<String>) {
    match predicate {
        Predicate::Comparison { left, right, .. } => {
            collect_expr(left, names);
            collect_expr(right, names);
        }
        Predicate::Membership { value, list } => {
            collect_expr(value, names);
            collect_expr(list, names);
        }
        Predicate::IsNull { expr, .. } => collect_expr(expr, names),
        Predicate::Exists(exists) => {
            collect_pattern(&exists.pattern, names);
            if let Some(p) = &exists.predicate {
                collect_predicate(p, names);
            }
        }
        Predicate::Quantified {
            list, predicate, ..
        } => {
            collect_expr(list, names);
            collect_predicate(predicate, names);
        }
        Predicate::And(children) | Predicate::Or(children) => {
            children.iter().for_each(|p| collect_predicate(p, names));
        }
        Predicate::Not(inner) => collect_predicate(inner, names),
        Predicate::Expr(expr) => collect_expr(expr, names),
        // Raw text cannot be inspected; callers declare what it reads.
        Predicate::Raw(raw) => {
            names.extend(raw.references.iter().map(|v| v.name().to_string()));
        }
        Predicate::Literal(_) => {}
    }
}
