//! Create, update and delete statements.
//!
//! Writes reuse the read machinery: the matched or created node is projected
//! like a read root, and bind rules are checked after the write with
//! `WITH * WHERE apoc.util.validatePredicate(...)` so a violating write rolls
//! the transaction back.

use crate::auth::{CompileOptions, Operation, RuleKind};
use crate::coerce::param_expr;
use crate::context::RequestContext;
use crate::error::{TranslateError, TranslateResult};
use crate::schema::{NodeType, ScalarField};
use crate::selection::SelectionNode;
use crate::translate::{CypherQuery, Translation, Translator};
use graft_cypher::{and, Create, Delete, Expr, Match, Param, Predicate, Query, Return, Set, SetItem, Variable, With};
use serde_json::Value;
use tracing::instrument;

impl Translator {
    /// `CREATE (this:Labels { ... })`, then CREATE bind checks and the
    /// projection of the new node.
    #[instrument(skip(self, input, selection, context), fields(type_name = %type_name))]
    pub fn create(
        &self,
        type_name: &str,
        input: &Value,
        selection: &[SelectionNode],
        context: &RequestContext,
    ) -> TranslateResult<CypherQuery> {
        let translation = Translation::new(self, context);
        let ty = translation.node_type(type_name)?;
        let this = translation.root_variable();
        let fields = translation.inputs(ty, input)?;

        let mut node = translation.root_node(&this, ty);
        for (field, value) in &fields {
            let value = param_expr(field.ty, field.list, Param::new(value.clone()));
            node = node.with_property(field.property.as_str(), value);
        }
        let mut query = Query::new().with(Create { pattern: node.into() });

        let bind = translation.bind_rules(&this, ty, &fields, Operation::Create, CompileOptions::default())?;
        if let Some(guard) = translation.guard(bind) {
            query.push(With::star().filter(Some(guard)));
        }

        translation.returning(&mut query, &this, ty, selection)?;
        translation.finish(&query)
    }

    /// `MATCH (this:Labels) WHERE ... SET this.p = $param`, then UPDATE bind
    /// checks and the projection of the updated nodes.
    ///
    /// Role and authentication checks run once, in the allow guard; the
    /// post-write bind check only re-tests data conditions.
    #[instrument(skip(self, filter, update, selection, context), fields(type_name = %type_name))]
    pub fn update(
        &self,
        type_name: &str,
        filter: Option<&Value>,
        update: &Value,
        selection: &[SelectionNode],
        context: &RequestContext,
    ) -> TranslateResult<CypherQuery> {
        let translation = Translation::new(self, context);
        let ty = translation.node_type(type_name)?;
        let this = translation.root_variable();
        let fields = translation.inputs(ty, update)?;

        let field_allow = translation.field_rules(
            &this,
            &fields,
            Operation::Update,
            RuleKind::Allow,
            CompileOptions::default(),
        )?;
        let predicate = translation.match_constraints(&this, ty, filter, field_allow, Operation::Update)?;
        let mut query = Query::new().with(Match::new(translation.root_node(&this, ty)).filter(predicate));

        let items: Vec<SetItem> = fields
            .iter()
            .map(|(field, value)| SetItem {
                target: Expr::prop(&this, field.property.as_str()),
                value: param_expr(field.ty, field.list, Param::new(value.clone())),
            })
            .collect();
        if !items.is_empty() {
            query.push(Set { items });
        }

        let bind = translation.bind_rules(&this, ty, &fields, Operation::Update, CompileOptions::data_only())?;
        if let Some(guard) = translation.guard(bind) {
            query.push(With::star().filter(Some(guard)));
        }

        translation.returning(&mut query, &this, ty, selection)?;
        translation.finish(&query)
    }

    /// `MATCH (this:Labels) WHERE ... DETACH DELETE this`
    #[instrument(skip(self, filter, context), fields(type_name = %type_name))]
    pub fn delete(
        &self,
        type_name: &str,
        filter: Option<&Value>,
        context: &RequestContext,
    ) -> TranslateResult<CypherQuery> {
        let translation = Translation::new(self, context);
        let ty = translation.node_type(type_name)?;
        let this = translation.root_variable();

        let predicate = translation.match_constraints(&this, ty, filter, None, Operation::Delete)?;
        let query = Query::new()
            .with(Match::new(translation.root_node(&this, ty)).filter(predicate))
            .with(Delete {
                targets: vec![this],
                detach: true,
            });
        translation.finish(&query)
    }
}

impl<'a> Translation<'a> {
    /// Input object entries as scalar fields with coerced values.
    fn inputs<'t>(&self, ty: &'t NodeType, input: &Value) -> TranslateResult<Vec<(&'t ScalarField, Value)>> {
        let object = input.as_object().ok_or_else(|| {
            TranslateError::MalformedInput(format!("input for {} must be an object, got {input}", ty.name))
        })?;

        let mut fields = Vec::with_capacity(object.len());
        for (key, value) in object {
            let field = ty.field(key).ok_or_else(|| {
                TranslateError::MalformedInput(format!("{} has no writable field {key}", ty.name))
            })?;
            let value = self
                .coercion
                .coerce_field(field.ty, field.list, value)
                .map_err(|e| TranslateError::MalformedInput(format!("input {}.{key}: {e}", ty.name)))?;
            fields.push((field, value));
        }
        Ok(fields)
    }

    /// Type-level and written-field bind rules, AND-ed.
    fn bind_rules(
        &self,
        this: &Variable,
        ty: &NodeType,
        fields: &[(&ScalarField, Value)],
        operation: Operation,
        options: CompileOptions,
    ) -> TranslateResult<Option<Predicate>> {
        let type_rules = self
            .auth()
            .compile_rules(&ty.auth, operation, this, RuleKind::Bind, options)?;
        let field_rules = self.field_rules(this, fields, operation, RuleKind::Bind, options)?;
        Ok(and(type_rules.into_iter().chain(field_rules)))
    }

    /// Rules of the written fields; each field's rules are OR-ed, fields AND-ed.
    fn field_rules(
        &self,
        this: &Variable,
        fields: &[(&ScalarField, Value)],
        operation: Operation,
        kind: RuleKind,
        options: CompileOptions,
    ) -> TranslateResult<Option<Predicate>> {
        let auth = self.auth();
        let mut compiled = Vec::new();
        for (field, _) in fields {
            compiled.extend(auth.compile_rules(&field.auth, operation, this, kind, options)?);
        }
        Ok(and(compiled))
    }

    /// Project the written node: sub-queries, the field allow guard, then
    /// `RETURN this { ... } AS this`.
    fn returning(
        &self,
        query: &mut Query,
        this: &Variable,
        ty: &NodeType,
        selection: &[SelectionNode],
    ) -> TranslateResult<()> {
        let projection = self.project(this, ty, selection, 1)?;
        if let Some(guard) = self.guard(projection.field_allow) {
            query.push(With::star().filter(Some(guard)));
        }
        for clause in projection.clauses {
            query.push(clause);
        }
        query.push(Return::single(projection.map, this));
        Ok(())
    }
}
