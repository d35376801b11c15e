//! Common test utilities for translation tests.
#![allow(dead_code)]

use graft_config::GraftConfig;
use graft_cypher::{ComparisonOp, Expr, Literal, Pattern, Predicate, Quantifier, Variable};
use graft_translate::{Translator, TypeRegistry, TypeRegistryBuilder};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Install a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Movies, actors, users and posts with a mix of type and field rules.
pub fn fixture_registry() -> TypeRegistry {
    TypeRegistryBuilder::new()
        .add_json(json!([
            {
                "name": "Movie",
                "fields": [
                    {"name": "title", "type": "String"},
                    {"name": "released", "type": "Int"}
                ],
                "relationships": [
                    {"name": "actors", "type": "ACTED_IN", "direction": "IN", "target": "Actor"}
                ],
                "cypherFields": [
                    {
                        "name": "topActors",
                        "statement": "MATCH (this)<-[:ACTED_IN]-(a:Actor) RETURN a AS result ORDER BY a.name LIMIT $limit",
                        "target": "Actor",
                        "list": true,
                        "arguments": [{"name": "limit", "type": "Int", "default": 3}]
                    },
                    {
                        "name": "castSize",
                        "statement": "MATCH (this)<-[:ACTED_IN]-(a:Actor) WHERE a.name STARTS WITH $prefix RETURN count(a) AS result",
                        "arguments": [{"name": "prefix", "type": "String"}]
                    }
                ]
            },
            {
                "name": "Actor",
                "fields": [{"name": "name", "type": "String"}],
                "relationships": [
                    {"name": "movies", "type": "ACTED_IN", "target": "Movie"}
                ]
            },
            {
                "name": "User",
                "fields": [
                    {"name": "id", "type": "ID"},
                    {"name": "name", "type": "String"},
                    {"name": "email", "type": "String", "auth": [{"operations": ["READ"], "allow": {"id": "$jwt.sub"}}]}
                ],
                "relationships": [
                    {"name": "posts", "type": "HAS_POST", "target": "Post"}
                ],
                "auth": [
                    {"operations": ["CREATE"], "roles": ["admin"], "bind": {"id": "$jwt.sub"}},
                    {"operations": ["UPDATE", "DELETE"], "allow": {"id": "$jwt.sub"}}
                ]
            },
            {
                "name": "Post",
                "fields": [
                    {"name": "id", "type": "ID"},
                    {"name": "content", "type": "String"},
                    {"name": "published", "type": "Boolean"}
                ],
                "relationships": [
                    {"name": "author", "type": "HAS_POST", "direction": "IN", "target": "User", "cardinality": "ONE"}
                ],
                "auth": [
                    {"operations": ["READ"], "where": {"author": {"id": "$jwt.sub"}}},
                    {"operations": ["READ"], "roles": ["moderator"]}
                ]
            }
        ]))
        .expect("fixture definitions deserialize")
        .build()
        .expect("fixture registry builds")
}

pub fn fixture_translator() -> Translator {
    Translator::new(Arc::new(fixture_registry()), GraftConfig::default()).expect("default config is valid")
}

/// Every `$name` placeholder in a statement, in order of appearance.
pub fn placeholders(statement: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = statement.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            continue;
        }
        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

// ============================================================================
// In-memory predicate evaluation
// ============================================================================

struct Node {
    labels: Vec<String>,
    properties: Value,
}

struct Edge {
    from: usize,
    rel_type: String,
    to: usize,
}

/// A tiny property graph that evaluates compiled predicates the way the
/// database would, for the subset of Cypher the compilers emit.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

type Env = HashMap<String, usize>;

const NODE_MARKER: &str = "__node";

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&mut self, labels: &[&str], properties: Value) -> usize {
        self.nodes.push(Node {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties,
        });
        self.nodes.len() - 1
    }

    pub fn edge(&mut self, from: usize, rel_type: &str, to: usize) {
        self.edges.push(Edge {
            from,
            rel_type: rel_type.to_string(),
            to,
        });
    }

    /// Whether `predicate` holds with `variable` bound to `node`.
    pub fn holds(&self, predicate: &Predicate, variable: &Variable, node: usize) -> bool {
        let mut env = Env::new();
        env.insert(variable.name().to_string(), node);
        self.predicate(predicate, &env)
    }

    fn predicate(&self, predicate: &Predicate, env: &Env) -> bool {
        match predicate {
            Predicate::Comparison { left, op, right } => {
                compare(&self.expr(left, env), *op, &self.expr(right, env))
            }
            Predicate::Membership { value, list } => {
                let value = self.expr(value, env);
                matches!(self.expr(list, env), Value::Array(items) if items.contains(&value))
            }
            Predicate::IsNull { expr, negated } => self.expr(expr, env).is_null() != *negated,
            Predicate::Exists(exists) => self.matches(&exists.pattern, env).into_iter().any(|local| {
                exists
                    .predicate
                    .as_ref()
                    .map_or(true, |p| self.predicate(p, &local))
            }),
            Predicate::Quantified {
                quantifier,
                variable,
                list,
                predicate,
            } => {
                let items = match self.expr(list, env) {
                    Value::Array(items) => items,
                    other => panic!("quantifier over non-list {other}"),
                };
                let hits = items
                    .iter()
                    .filter(|item| {
                        let mut local = env.clone();
                        if let Some(id) = item.get(NODE_MARKER).and_then(Value::as_u64) {
                            local.insert(variable.name().to_string(), id as usize);
                        }
                        self.predicate(predicate, &local)
                    })
                    .count();
                match quantifier {
                    Quantifier::Any => hits > 0,
                    Quantifier::All => hits == items.len(),
                    Quantifier::None => hits == 0,
                    Quantifier::Single => hits == 1,
                }
            }
            Predicate::And(children) => children.iter().all(|p| self.predicate(p, env)),
            Predicate::Or(children) => children.is_empty() || children.iter().any(|p| self.predicate(p, env)),
            Predicate::Not(inner) => !self.predicate(inner, env),
            Predicate::Literal(value) => *value,
            Predicate::Expr(expr) => self.expr(expr, env) == Value::Bool(true),
            Predicate::Raw(_) => panic!("raw predicates cannot be evaluated"),
        }
    }

    fn expr(&self, expr: &Expr, env: &Env) -> Value {
        match expr {
            Expr::Variable(v) => node_value(env[v.name()]),
            Expr::Property(base, key) => match self.expr(base, env) {
                Value::Object(map) if map.contains_key(NODE_MARKER) => {
                    let id = map[NODE_MARKER].as_u64().unwrap_or_default() as usize;
                    self.nodes[id].properties.get(key).cloned().unwrap_or(Value::Null)
                }
                other => other.get(key).cloned().unwrap_or(Value::Null),
            },
            Expr::Param(param) => param.value().clone(),
            Expr::Literal(literal) => literal_value(literal),
            Expr::List(items) => Value::Array(items.iter().map(|e| self.expr(e, env)).collect()),
            Expr::Function(call) if call.name == "apoc.util.validatePredicate" => {
                // Raises when the first argument holds; a raise fails the row.
                let raises = self.expr(&call.args[0], env) == Value::Bool(true);
                Value::Bool(!raises)
            }
            Expr::Function(call) => call.args.first().map(|e| self.expr(e, env)).unwrap_or(Value::Null),
            Expr::PatternComprehension(comprehension) => Value::Array(
                self.matches(&comprehension.pattern, env)
                    .into_iter()
                    .filter(|local| {
                        comprehension
                            .predicate
                            .as_ref()
                            .map_or(true, |p| self.predicate(p, local))
                    })
                    .map(|local| self.expr(&comprehension.projection, &local))
                    .collect(),
            ),
            Expr::Predicate(p) => Value::Bool(self.predicate(p, env)),
            other => panic!("unsupported expression {other:?}"),
        }
    }

    /// Every binding of the pattern's unbound variables that matches.
    fn matches(&self, pattern: &Pattern, env: &Env) -> Vec<Env> {
        let mut results = Vec::new();
        for start in 0..self.nodes.len() {
            let mut local = env.clone();
            if self.accept(&pattern.start, start, &mut local) {
                self.walk(pattern, 0, start, local, &mut results);
            }
        }
        results
    }

    fn walk(&self, pattern: &Pattern, hop: usize, current: usize, env: Env, results: &mut Vec<Env>) {
        let Some((relationship, node)) = pattern.hops.get(hop) else {
            results.push(env);
            return;
        };
        for edge in &self.edges {
            if !relationship.types.is_empty() && !relationship.types.contains(&edge.rel_type) {
                continue;
            }
            let next = match relationship.direction {
                graft_cypher::Direction::Out if edge.from == current => Some(edge.to),
                graft_cypher::Direction::In if edge.to == current => Some(edge.from),
                graft_cypher::Direction::Undirected if edge.from == current => Some(edge.to),
                graft_cypher::Direction::Undirected if edge.to == current => Some(edge.from),
                _ => None,
            };
            if let Some(next) = next {
                let mut local = env.clone();
                if self.accept(node, next, &mut local) {
                    self.walk(pattern, hop + 1, next, local, results);
                }
            }
        }
    }

    fn accept(&self, pattern: &graft_cypher::NodePattern, id: usize, env: &mut Env) -> bool {
        if !pattern.labels.iter().all(|l| self.nodes[id].labels.contains(l)) {
            return false;
        }
        match &pattern.variable {
            Some(v) => match env.get(v.name()) {
                Some(bound) => *bound == id,
                None => {
                    env.insert(v.name().to_string(), id);
                    true
                }
            },
            None => true,
        }
    }
}

fn node_value(id: usize) -> Value {
    let mut marker = serde_json::Map::new();
    marker.insert(NODE_MARKER.to_string(), json!(id));
    Value::Object(marker)
}

fn compare(left: &Value, op: ComparisonOp, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match op {
        ComparisonOp::Eq => left == right,
        ComparisonOp::Ne => left != right,
        ComparisonOp::Contains => str_pair(left, right).is_some_and(|(l, r)| l.contains(r)),
        ComparisonOp::StartsWith => str_pair(left, right).is_some_and(|(l, r)| l.starts_with(r)),
        ComparisonOp::EndsWith => str_pair(left, right).is_some_and(|(l, r)| l.ends_with(r)),
        ComparisonOp::Lt | ComparisonOp::Lte | ComparisonOp::Gt | ComparisonOp::Gte => {
            let ordering = match (left.as_f64(), right.as_f64()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => str_pair(left, right).map(|(l, r)| l.cmp(r)),
            };
            ordering.is_some_and(|o| match op {
                ComparisonOp::Lt => o.is_lt(),
                ComparisonOp::Lte => o.is_le(),
                ComparisonOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            })
        }
        ComparisonOp::Matches => panic!("regex matching is not evaluated"),
    }
}

fn str_pair<'v>(left: &'v Value, right: &'v Value) -> Option<(&'v str, &'v str)> {
    Some((left.as_str()?, right.as_str()?))
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => json!(i),
        Literal::Float(f) => json!(f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::List(items) => Value::Array(items.iter().map(literal_value).collect()),
    }
}
