//! Where-argument filters.
//!
//! A filter object maps keys to conditions. Plain field names compare for
//! equality, suffixed names pick an operator (`title_CONTAINS`), `AND`/`OR`
//! take lists of filter objects and `NOT` takes one. Relationship field names
//! filter on related nodes with `_SOME`, `_NONE`, `_ALL` and `_SINGLE`.

use crate::coerce::{param_expr, ScalarCoercion};
use crate::error::{TranslateError, TranslateResult};
use crate::schema::{NodeType, RelationshipField, ScalarField, ScalarType, TypeRegistry};
use graft_cypher::{
    and, compare, exists, in_list, is_not_null, is_null, not, or, quantified, ComparisonOp, Expr, NameAuthority,
    NodePattern, Param, Pattern, PatternComprehension, Predicate, Quantifier, RelationshipPattern, Variable,
};
use serde_json::{Map, Value};
use tracing::trace;

/// Operator selected by a scalar filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarOp {
    Eq,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Matches,
}

/// How related nodes must match a relationship filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipOp {
    Some,
    None,
    All,
    Single,
}

/// Longest suffixes first so `_NOT_IN` is never read as `_IN`.
const SCALAR_SUFFIXES: &[(&str, ScalarOp)] = &[
    ("_NOT_STARTS_WITH", ScalarOp::NotStartsWith),
    ("_NOT_ENDS_WITH", ScalarOp::NotEndsWith),
    ("_NOT_CONTAINS", ScalarOp::NotContains),
    ("_STARTS_WITH", ScalarOp::StartsWith),
    ("_ENDS_WITH", ScalarOp::EndsWith),
    ("_CONTAINS", ScalarOp::Contains),
    ("_MATCHES", ScalarOp::Matches),
    ("_NOT_IN", ScalarOp::NotIn),
    ("_NOT", ScalarOp::Not),
    ("_LTE", ScalarOp::Lte),
    ("_GTE", ScalarOp::Gte),
    ("_IN", ScalarOp::In),
    ("_LT", ScalarOp::Lt),
    ("_GT", ScalarOp::Gt),
];

const RELATIONSHIP_SUFFIXES: &[(&str, RelationshipOp)] = &[
    ("_SINGLE", RelationshipOp::Single),
    ("_SOME", RelationshipOp::Some),
    ("_NONE", RelationshipOp::None),
    ("_ALL", RelationshipOp::All),
];

/// Compiles `where` arguments into predicates.
pub struct FilterCompiler<'a> {
    names: &'a NameAuthority,
    registry: &'a TypeRegistry,
    coercion: &'a dyn ScalarCoercion,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(names: &'a NameAuthority, registry: &'a TypeRegistry, coercion: &'a dyn ScalarCoercion) -> Self {
        Self {
            names,
            registry,
            coercion,
        }
    }

    /// Compile an optional filter for `variable` of type `ty`.
    ///
    /// `None` and `{}` both mean "unconstrained".
    pub fn compile(
        &self,
        filter: Option<&Value>,
        variable: &Variable,
        ty: &NodeType,
    ) -> TranslateResult<Option<Predicate>> {
        match filter {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.object(value, variable, ty),
        }
    }

    fn object(&self, value: &Value, variable: &Variable, ty: &NodeType) -> TranslateResult<Option<Predicate>> {
        let object = as_object(value, &ty.name)?;
        let mut parts = Vec::with_capacity(object.len());
        for (key, value) in object {
            let part = match key.as_str() {
                "AND" => {
                    let mut children = Vec::new();
                    for child in as_list(key, value)? {
                        children.extend(self.object(child, variable, ty)?);
                    }
                    and(children)
                }
                "OR" => self.disjunction(key, value, variable, ty)?,
                "NOT" => self.object(value, variable, ty)?.map(not),
                _ => self.key(key, value, variable, ty)?,
            };
            parts.extend(part);
        }
        trace!(type_name = %ty.name, keys = object.len(), parts = parts.len(), "compiled filter object");
        Ok(and(parts))
    }

    /// An unconstrained member makes the whole disjunction unconstrained.
    fn disjunction(
        &self,
        key: &str,
        value: &Value,
        variable: &Variable,
        ty: &NodeType,
    ) -> TranslateResult<Option<Predicate>> {
        let mut children = Vec::new();
        for child in as_list(key, value)? {
            match self.object(child, variable, ty)? {
                Some(predicate) => children.push(predicate),
                None => return Ok(None),
            }
        }
        Ok(or(children))
    }

    fn key(&self, key: &str, value: &Value, variable: &Variable, ty: &NodeType) -> TranslateResult<Option<Predicate>> {
        if let Some(field) = ty.field(key) {
            return self.scalar(field, ScalarOp::Eq, value, variable).map(Some);
        }
        if let Some(relationship) = ty.relationship(key) {
            return self.relationship(relationship, None, value, variable).map(Some);
        }
        for (suffix, op) in SCALAR_SUFFIXES {
            if let Some(field) = key.strip_suffix(suffix).and_then(|base| ty.field(base)) {
                return self.scalar(field, *op, value, variable).map(Some);
            }
        }
        for (suffix, op) in RELATIONSHIP_SUFFIXES {
            if let Some(relationship) = key.strip_suffix(suffix).and_then(|base| ty.relationship(base)) {
                return self.relationship(relationship, Some(*op), value, variable).map(Some);
            }
        }
        Err(TranslateError::MalformedInput(format!(
            "unknown filter {key} on {}",
            ty.name
        )))
    }

    fn scalar(
        &self,
        field: &ScalarField,
        op: ScalarOp,
        value: &Value,
        variable: &Variable,
    ) -> TranslateResult<Predicate> {
        let target = Expr::prop(variable, field.property.as_str());

        match op {
            ScalarOp::Eq if value.is_null() => return Ok(is_null(target)),
            ScalarOp::Not if value.is_null() => return Ok(is_not_null(target)),
            _ => {}
        }

        let (comparison, negated) = match op {
            ScalarOp::In => return self.membership(field, value, target),
            ScalarOp::NotIn => return self.membership(field, value, target).map(not),
            ScalarOp::Eq => (ComparisonOp::Eq, false),
            ScalarOp::Not => (ComparisonOp::Eq, true),
            ScalarOp::Lt => (ComparisonOp::Lt, false),
            ScalarOp::Lte => (ComparisonOp::Lte, false),
            ScalarOp::Gt => (ComparisonOp::Gt, false),
            ScalarOp::Gte => (ComparisonOp::Gte, false),
            ScalarOp::Contains => (ComparisonOp::Contains, false),
            ScalarOp::NotContains => (ComparisonOp::Contains, true),
            ScalarOp::StartsWith => (ComparisonOp::StartsWith, false),
            ScalarOp::NotStartsWith => (ComparisonOp::StartsWith, true),
            ScalarOp::EndsWith => (ComparisonOp::EndsWith, false),
            ScalarOp::NotEndsWith => (ComparisonOp::EndsWith, true),
            ScalarOp::Matches => (ComparisonOp::Matches, false),
        };
        check_operator(field, comparison)?;

        let list = field.list && matches!(op, ScalarOp::Eq | ScalarOp::Not);
        let value = self.coerce(field, list, value)?;
        let predicate = compare(target, comparison, param_expr(field.ty, list, Param::new(value)));
        Ok(if negated { not(predicate) } else { predicate })
    }

    fn membership(&self, field: &ScalarField, value: &Value, target: Expr) -> TranslateResult<Predicate> {
        let items = as_list(&field.name, value)?;
        let mut coerced = Vec::with_capacity(items.len());
        for item in items {
            coerced.push(self.coerce(field, false, item)?);
        }
        Ok(in_list(target, param_expr(field.ty, true, Param::new(Value::Array(coerced)))))
    }

    fn relationship(
        &self,
        relationship: &RelationshipField,
        op: Option<RelationshipOp>,
        value: &Value,
        variable: &Variable,
    ) -> TranslateResult<Predicate> {
        let target = self.registry.get(&relationship.target).ok_or_else(|| {
            TranslateError::MalformedInput(format!("unknown type {}", relationship.target))
        })?;

        // `rel: null` asks for nodes without any related node.
        if op.is_none() && value.is_null() {
            return Ok(not(exists(self.pattern(variable, relationship, target, None), None)));
        }

        let related = self.names.fresh("this");
        let inner = self.object(value, &related, target)?;
        let matching = || self.pattern(variable, relationship, target, Some(&related));

        Ok(match op.unwrap_or(RelationshipOp::Some) {
            RelationshipOp::Some => exists(matching(), inner),
            RelationshipOp::None => not(exists(matching(), inner)),
            RelationshipOp::All => {
                let existence = exists(self.pattern(variable, relationship, target, None), None);
                match inner {
                    Some(inner) => Predicate::And(vec![existence, not(exists(matching(), Some(not(inner))))]),
                    None => existence,
                }
            }
            RelationshipOp::Single => {
                let counted = self.names.fresh("var");
                let list = Expr::PatternComprehension(Box::new(PatternComprehension {
                    pattern: matching(),
                    predicate: inner,
                    projection: Expr::literal(1),
                }));
                quantified(Quantifier::Single, &counted, list, Predicate::Literal(true))
            }
        })
    }

    fn pattern(
        &self,
        variable: &Variable,
        relationship: &RelationshipField,
        target: &NodeType,
        related: Option<&Variable>,
    ) -> Pattern {
        let node = match related {
            Some(related) => NodePattern::new(related),
            None => NodePattern::anonymous(),
        };
        Pattern::node(NodePattern::new(variable)).related(
            RelationshipPattern::new(relationship.rel_type.as_str(), relationship.direction),
            node.with_labels(target.labels.iter().cloned()),
        )
    }

    fn coerce(&self, field: &ScalarField, list: bool, value: &Value) -> TranslateResult<Value> {
        self.coercion
            .coerce_field(field.ty, list, value)
            .map_err(|e| TranslateError::MalformedInput(format!("filter on {}: {e}", field.name)))
    }
}

fn check_operator(field: &ScalarField, op: ComparisonOp) -> TranslateResult<()> {
    let supported = match op {
        ComparisonOp::Contains | ComparisonOp::StartsWith | ComparisonOp::EndsWith | ComparisonOp::Matches => {
            matches!(field.ty, ScalarType::String | ScalarType::Id)
        }
        ComparisonOp::Lt | ComparisonOp::Lte | ComparisonOp::Gt | ComparisonOp::Gte => field.ty.is_ordered(),
        ComparisonOp::Eq | ComparisonOp::Ne => true,
    };
    if supported {
        Ok(())
    } else {
        Err(TranslateError::MalformedInput(format!(
            "{} is not supported on {} ({:?})",
            op.as_str(),
            field.name,
            field.ty
        )))
    }
}

fn as_object<'v>(value: &'v Value, type_name: &str) -> TranslateResult<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TranslateError::MalformedInput(format!("filter on {type_name} must be an object, got {value}")))
}

fn as_list<'v>(key: &str, value: &'v Value) -> TranslateResult<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| TranslateError::MalformedInput(format!("{key} expects a list, got {value}")))
}
