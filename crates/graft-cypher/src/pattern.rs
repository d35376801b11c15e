//! Node and relationship pattern fragments.

use crate::expr::Expr;
use crate::variable::Variable;

/// Direction of a relationship hop, relative to the node on its left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// `-[]->`
    #[default]
    Out,
    /// `<-[]-`
    In,
    /// `-[]-`
    Undirected,
}

/// `(variable:Label1:Label2 { key: value })`
#[derive(Clone, Debug, Default)]
pub struct NodePattern {
    /// Binding for the node; `None` renders `(:Label)`.
    pub variable: Option<Variable>,
    /// Labels in declared order; empty renders `(variable)`.
    pub labels: Vec<String>,
    /// Inline property filters, rendered only when non-empty.
    pub properties: Vec<(String, Expr)>,
}

impl NodePattern {
    /// A node bound to `variable`, without labels.
    pub fn new(variable: &Variable) -> Self {
        Self {
            variable: Some(variable.clone()),
            ..Default::default()
        }
    }

    /// A node with no binding.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Add labels, keeping their order.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Add an inline property filter.
    pub fn with_property(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    /// Drop the binding (the outer scope already names this node).
    pub fn without_variable(mut self) -> Self {
        self.variable = None;
        self
    }

    /// Drop the labels (the variable is already bound with them).
    pub fn without_labels(mut self) -> Self {
        self.labels.clear();
        self
    }
}

/// `-[variable:TYPE { key: value }]->`
#[derive(Clone, Debug, Default)]
pub struct RelationshipPattern {
    /// Binding for the relationship.
    pub variable: Option<Variable>,
    /// Relationship types, rendered `:A|B`.
    pub types: Vec<String>,
    /// Arrow direction.
    pub direction: Direction,
    /// Inline property filters.
    pub properties: Vec<(String, Expr)>,
}

impl RelationshipPattern {
    /// An unbound relationship of `rel_type` in `direction`.
    pub fn new(rel_type: impl Into<String>, direction: Direction) -> Self {
        Self {
            types: vec![rel_type.into()],
            direction,
            ..Default::default()
        }
    }

    /// Bind the relationship to `variable`.
    pub fn with_variable(mut self, variable: &Variable) -> Self {
        self.variable = Some(variable.clone());
        self
    }

    /// Add an inline property filter.
    pub fn with_property(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// A path pattern: a start node followed by relationship hops.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// First node of the path.
    pub start: NodePattern,
    /// Each hop: the relationship and the node it reaches.
    pub hops: Vec<(RelationshipPattern, NodePattern)>,
}

impl Pattern {
    /// A single-node pattern.
    pub fn node(start: NodePattern) -> Self {
        Self {
            start,
            hops: Vec::new(),
        }
    }

    /// Append a hop.
    pub fn related(mut self, relationship: RelationshipPattern, node: NodePattern) -> Self {
        self.hops.push((relationship, node));
        self
    }

    /// All variables bound or referenced by the pattern, left to right.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();
        vars.extend(self.start.variable.as_ref());
        for (rel, node) in &self.hops {
            vars.extend(rel.variable.as_ref());
            vars.extend(node.variable.as_ref());
        }
        vars
    }

    /// All inline property expressions of the pattern.
    pub fn property_exprs(&self) -> Vec<&Expr> {
        let mut exprs: Vec<&Expr> = self.start.properties.iter().map(|(_, e)| e).collect();
        for (rel, node) in &self.hops {
            exprs.extend(rel.properties.iter().map(|(_, e)| e));
            exprs.extend(node.properties.iter().map(|(_, e)| e));
        }
        exprs
    }
}

impl From<NodePattern> for Pattern {
    fn from(node: NodePattern) -> Self {
        Pattern::node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_modes() {
        let this = Variable::named("this");
        let node = NodePattern::new(&this).with_labels(["Movie", "Film"]);
        assert_eq!(node.labels, vec!["Movie", "Film"]);

        let bare = node.clone().without_labels();
        assert!(bare.labels.is_empty());
        assert!(bare.variable.is_some());

        let anon = node.without_variable();
        assert!(anon.variable.is_none());
        assert_eq!(anon.labels.len(), 2);
    }

    #[test]
    fn test_pattern_variables_in_order() {
        let a = Variable::named("a");
        let r = Variable::named("r");
        let b = Variable::named("b");
        let pattern = Pattern::node(NodePattern::new(&a)).related(
            RelationshipPattern::new("KNOWS", Direction::Out).with_variable(&r),
            NodePattern::new(&b),
        );

        let names: Vec<_> = pattern.variables().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["a", "r", "b"]);
    }
}
