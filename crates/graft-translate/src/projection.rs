//! Map projections and the sub-queries behind non-scalar fields.

use crate::auth::{CompileOptions, Operation, RuleKind};
use crate::error::{TranslateError, TranslateResult};
use crate::schema::{Cardinality, CypherField, NodeType, RelationshipField, AUTH_PLACEHOLDER};
use crate::selection::SelectionNode;
use crate::translate::Translation;
use graft_cypher::{
    and, Call, Clause, Direction, Expr, MapProjection, Match, NodePattern, Param, Pattern, Predicate,
    ProjectionItem, Query, RawClause, RelationshipPattern, Return, Variable, With,
};
use serde_json::Value;
use tracing::trace;

/// Selection suffix that asks for aggregates over a relationship.
const AGGREGATE_SUFFIX: &str = "Aggregate";

/// The projection of one node plus the sub-queries it reads from.
pub(crate) struct Projection {
    /// `CALL { }` sub-queries, in selection order, placed before the map is used.
    pub(crate) clauses: Vec<Clause>,
    pub(crate) map: MapProjection,
    /// Field-level allow rules of the selected fields, AND-ed.
    pub(crate) field_allow: Option<Predicate>,
}

impl Translation<'_> {
    /// Project `selections` of `variable` (a `ty` node) at nesting `depth`.
    pub(crate) fn project(
        &self,
        variable: &Variable,
        ty: &NodeType,
        selections: &[SelectionNode],
        depth: usize,
    ) -> TranslateResult<Projection> {
        if depth > self.config.query.max_depth {
            return Err(TranslateError::MalformedInput(format!(
                "selection on {} nests deeper than {} levels",
                ty.name, self.config.query.max_depth
            )));
        }

        let mut map = MapProjection::new(variable);
        let mut clauses = Vec::new();
        let mut field_allow = Vec::new();

        for selection in selections {
            let key = selection.response_key();
            if let Some(field) = ty.field(&selection.name) {
                let auth = self.auth();
                field_allow.extend(auth.compile_rules(
                    &field.auth,
                    Operation::Read,
                    variable,
                    RuleKind::Allow,
                    CompileOptions::default(),
                )?);
                map = if key == field.property {
                    map.property(key)
                } else {
                    map.entry(key, Expr::prop(variable, field.property.as_str()))
                };
            } else if let Some(relationship) = ty.relationship(&selection.name) {
                let (call, out) = self.relationship_subquery(variable, relationship, selection, depth)?;
                clauses.push(call.into());
                map = map.entry(key, &out);
            } else if let Some(relationship) = selection
                .name
                .strip_suffix(AGGREGATE_SUFFIX)
                .and_then(|base| ty.relationship(base))
            {
                let (call, out) = self.aggregate_subquery(variable, relationship, selection)?;
                clauses.push(call.into());
                map = map.entry(key, &out);
            } else if let Some(field) = ty.cypher_field(&selection.name) {
                let (call, out) = self.cypher_subquery(variable, field, selection, depth)?;
                clauses.push(call.into());
                map = map.entry(key, &out);
            } else if selection.name == "__typename" {
                map = map.entry(key, Expr::literal(ty.name.as_str()));
            } else {
                return Err(TranslateError::MalformedInput(format!(
                    "{} has no field {}",
                    ty.name, selection.name
                )));
            }
        }

        trace!(type_name = %ty.name, depth, subqueries = clauses.len(), "built projection");
        Ok(Projection {
            clauses,
            map,
            field_allow: and(field_allow),
        })
    }

    /// `CALL { MATCH (var)-[r:T]->(n:Target) WHERE ... WITH n { ... } AS n
    /// RETURN collect(n) AS out }`
    fn relationship_subquery(
        &self,
        variable: &Variable,
        relationship: &RelationshipField,
        selection: &SelectionNode,
        depth: usize,
    ) -> TranslateResult<(Call, Variable)> {
        let target = self.node_type(&relationship.target)?;
        let edge = self.names.fresh("this");
        let node = self.names.fresh("this");
        let out = self.names.fresh("var");
        let direction = if selection.directed()? {
            relationship.direction
        } else {
            Direction::Undirected
        };

        let nested = self.project(&node, target, &selection.selections, depth + 1)?;
        let predicate = self.match_constraints(
            &node,
            target,
            selection.where_argument(),
            nested.field_allow,
            Operation::Read,
        )?;

        let pattern = Pattern::node(NodePattern::new(variable)).related(
            RelationshipPattern::new(relationship.rel_type.as_str(), direction).with_variable(&edge),
            NodePattern::new(&node).with_labels(target.labels.iter().cloned()),
        );
        let mut body = Query::new().with(Match::new(pattern).filter(predicate));
        body.extend(self.page(&node, target, &selection.options()?)?);
        for clause in nested.clauses {
            body.push(clause);
        }
        body.push(With::items(vec![ProjectionItem::aliased(nested.map, &node)]));
        body.push(Return::single(collected(Expr::var(&node), relationship.cardinality), &out));

        Ok((Call::scoped(body, node.name()), out))
    }

    /// `CALL { MATCH ... RETURN { count: count(n), node: { f: { min: ... } } } AS out }`
    fn aggregate_subquery(
        &self,
        variable: &Variable,
        relationship: &RelationshipField,
        selection: &SelectionNode,
    ) -> TranslateResult<(Call, Variable)> {
        let target = self.node_type(&relationship.target)?;
        let node = self.names.fresh("this");
        let out = self.names.fresh("var");

        let predicate = self.match_constraints(&node, target, selection.where_argument(), None, Operation::Read)?;
        let pattern = Pattern::node(NodePattern::new(variable)).related(
            RelationshipPattern::new(relationship.rel_type.as_str(), relationship.direction),
            NodePattern::new(&node).with_labels(target.labels.iter().cloned()),
        );

        let mut entries = Vec::with_capacity(selection.selections.len());
        for child in &selection.selections {
            let value = match child.name.as_str() {
                "count" => Expr::count(Expr::var(&node)),
                "node" => Expr::Map(self.field_aggregates(&node, target, child)?),
                other => {
                    return Err(TranslateError::MalformedInput(format!(
                        "{} has no aggregate {other}",
                        selection.name
                    )))
                }
            };
            entries.push((child.response_key().to_string(), value));
        }

        let body = Query::new()
            .with(Match::new(pattern).filter(predicate))
            .with(Return::single(Expr::Map(entries), &out));
        Ok((Call::scoped(body, node.name()), out))
    }

    fn field_aggregates(
        &self,
        node: &Variable,
        target: &NodeType,
        selection: &SelectionNode,
    ) -> TranslateResult<Vec<(String, Expr)>> {
        let mut fields = Vec::with_capacity(selection.selections.len());
        for field_selection in &selection.selections {
            let field = target.field(&field_selection.name).ok_or_else(|| {
                TranslateError::MalformedInput(format!("{} has no field {}", target.name, field_selection.name))
            })?;
            let property = Expr::prop(node, field.property.as_str());

            let mut functions = Vec::with_capacity(field_selection.selections.len());
            for function in &field_selection.selections {
                let (name, supported) = match function.name.as_str() {
                    "min" => ("min", field.ty.is_ordered()),
                    "max" => ("max", field.ty.is_ordered()),
                    "average" => ("avg", field.ty.is_numeric()),
                    "sum" => ("sum", field.ty.is_numeric()),
                    other => (other, false),
                };
                if !supported {
                    return Err(TranslateError::MalformedInput(format!(
                        "{} is not available on {}.{}",
                        function.name, target.name, field.name
                    )));
                }
                functions.push((function.response_key().to_string(), Expr::call(name, vec![property.clone()])));
            }
            fields.push((field_selection.response_key().to_string(), Expr::Map(functions)));
        }
        Ok(fields)
    }

    /// Custom statement field:
    ///
    /// Declared arguments are bound to fresh parameters for this occurrence
    /// of the field, so two aliases with different arguments do not clash.
    ///
    /// ```text
    /// CALL {
    ///     WITH var
    ///     CALL {
    ///         WITH var
    ///         WITH var AS this
    ///         <statement>
    ///     }
    ///     WITH <column> AS out_value
    ///     RETURN collect(out_value) AS out
    /// }
    /// ```
    fn cypher_subquery(
        &self,
        variable: &Variable,
        field: &CypherField,
        selection: &SelectionNode,
        depth: usize,
    ) -> TranslateResult<(Call, Variable)> {
        let this = Variable::named("this");
        let column = Variable::named(&field.column);
        let value = self.names.fresh("this");
        let out = self.names.fresh("var");

        let mut params = self.statement_arguments(field, selection)?;
        params.push((AUTH_PLACEHOLDER.to_string(), self.auth.clone()));

        let mut statement = Query::new();
        if *variable != this {
            statement.push(With::items(vec![ProjectionItem::aliased(Expr::var(variable), &this)]));
        }
        statement.push(RawClause {
            text: field.statement.clone(),
            params,
            references: vec![this],
            outputs: vec![column.clone()],
        });

        let mut body = Query::new()
            .with(Call::new(statement))
            .with(With::items(vec![ProjectionItem::aliased(Expr::var(&column), &value)]));

        let projected = match &field.target {
            Some(target_name) => {
                let target = self.node_type(target_name)?;
                let nested = self.project(&value, target, &selection.selections, depth + 1)?;
                let predicate = self.match_constraints(&value, target, None, nested.field_allow, Operation::Read)?;
                if predicate.is_some() {
                    body.push(With::star().filter(predicate));
                }
                for clause in nested.clauses {
                    body.push(clause);
                }
                Expr::from(nested.map)
            }
            None => Expr::var(&value),
        };

        let cardinality = if field.list { Cardinality::Many } else { Cardinality::One };
        body.push(Return::single(collected(projected, cardinality), &out));
        Ok((Call::new(body), out))
    }

    /// One parameter per declared argument: the supplied value, else the
    /// declared default, else `null`.
    fn statement_arguments(
        &self,
        field: &CypherField,
        selection: &SelectionNode,
    ) -> TranslateResult<Vec<(String, Param)>> {
        if let Some(unknown) = selection.arguments.keys().find(|name| field.argument(name).is_none()) {
            return Err(TranslateError::MalformedInput(format!(
                "{} has no argument {unknown}",
                field.name
            )));
        }

        let mut params = Vec::with_capacity(field.arguments.len());
        for argument in &field.arguments {
            let value = match selection.argument(&argument.name).or(argument.default.as_ref()) {
                Some(value) => self
                    .coercion
                    .coerce_field(argument.ty, argument.list, value)
                    .map_err(|e| {
                        TranslateError::MalformedInput(format!("argument {}.{}: {e}", field.name, argument.name))
                    })?,
                None => Value::Null,
            };
            params.push((argument.name.clone(), Param::new(value)));
        }
        Ok(params)
    }
}

/// `collect(expr)`, or `head(collect(expr))` for single-valued fields.
fn collected(expr: Expr, cardinality: Cardinality) -> Expr {
    match cardinality {
        Cardinality::Many => Expr::collect(expr),
        Cardinality::One => Expr::head(Expr::collect(expr)),
    }
}
