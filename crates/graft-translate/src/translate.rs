//! Top-level translation of a selection into a Cypher statement.

use crate::auth::{validate_predicate, AuthCompiler, CompileOptions, Operation, RuleKind};
use crate::coerce::{DefaultCoercion, ScalarCoercion};
use crate::context::RequestContext;
use crate::error::{TranslateError, TranslateResult};
use crate::filter::FilterCompiler;
use crate::schema::{NodeType, TypeRegistry};
use crate::selection::{Options, SelectionNode};
use graft_config::{ConfigResult, GraftConfig};
use graft_cypher::{
    and, CypherRenderer, Expr, Match, NameAuthority, NodePattern, Param, Predicate, Query, QueryRenderer, Return,
    SortItem, Variable, With,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A rendered statement with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherQuery {
    pub statement: String,
    /// Every `$placeholder` in `statement`, in order of first appearance.
    pub parameters: IndexMap<String, Value>,
}

/// Translates selections against a schema.
///
/// The translator is immutable and can be shared across threads; each call
/// builds its own variable names and parameter table.
#[derive(Clone)]
pub struct Translator {
    registry: Arc<TypeRegistry>,
    config: Arc<GraftConfig>,
    coercion: Arc<dyn ScalarCoercion>,
}

impl Translator {
    /// Validates `config` the way [`graft_config::ConfigLoader`] does, so
    /// configuration built in code gets the same checks as a loaded file.
    pub fn new(registry: Arc<TypeRegistry>, config: GraftConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            config: Arc::new(config),
            coercion: Arc::new(DefaultCoercion),
        })
    }

    /// Replace the scalar coercion used for filter, rule and input values.
    pub fn with_coercion(mut self, coercion: Arc<dyn ScalarCoercion>) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    /// Translate a read of `selection.type_name` nodes.
    ///
    /// The root match carries the `where` filter, READ where rules and the
    /// READ allow guard; `options` sort and page the root nodes; every
    /// relationship, aggregate and custom field becomes a sub-query.
    #[instrument(skip(self, selection, context), fields(field = %selection.name))]
    pub fn translate(&self, selection: &SelectionNode, context: &RequestContext) -> TranslateResult<CypherQuery> {
        let translation = Translation::new(self, context);
        let type_name = selection.type_name.as_deref().ok_or_else(|| {
            TranslateError::MalformedInput(format!("root selection {} has no type", selection.name))
        })?;
        let ty = translation.node_type(type_name)?;
        let this = translation.root_variable();

        let projection = translation.project(&this, ty, &selection.selections, 1)?;
        let predicate = translation.match_constraints(
            &this,
            ty,
            selection.where_argument(),
            projection.field_allow,
            Operation::Read,
        )?;

        let mut query = Query::new().with(Match::new(translation.root_node(&this, ty)).filter(predicate));
        query.extend(translation.page(&this, ty, &selection.options()?)?);
        for clause in projection.clauses {
            query.push(clause);
        }
        query.push(Return::single(projection.map, &this));

        translation.finish(&query)
    }
}

/// State for one translation: variable names, the `$auth` parameter and
/// borrowed schema, config and request.
pub(crate) struct Translation<'a> {
    pub(crate) names: NameAuthority,
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) config: &'a GraftConfig,
    pub(crate) context: &'a RequestContext,
    pub(crate) coercion: &'a dyn ScalarCoercion,
    pub(crate) auth: Param,
}

impl<'a> Translation<'a> {
    pub(crate) fn new(translator: &'a Translator, context: &'a RequestContext) -> Self {
        let config = translator.config.as_ref();
        Self {
            names: NameAuthority::new(),
            registry: translator.registry.as_ref(),
            config,
            context,
            coercion: translator.coercion.as_ref(),
            auth: Param::named("auth", context.auth_value(&config.auth.roles_claim)),
        }
    }

    pub(crate) fn root_variable(&self) -> Variable {
        self.names.reserve(&self.config.query.root_variable)
    }

    pub(crate) fn root_node(&self, this: &Variable, ty: &NodeType) -> NodePattern {
        NodePattern::new(this).with_labels(ty.labels.iter().cloned())
    }

    pub(crate) fn node_type(&self, name: &str) -> TranslateResult<&'a NodeType> {
        self.registry
            .get(name)
            .ok_or_else(|| TranslateError::MalformedInput(format!("unknown type {name}")))
    }

    pub(crate) fn auth(&self) -> AuthCompiler<'_> {
        AuthCompiler::new(&self.names, self.context, &self.auth, &self.config.auth, self.coercion)
    }

    pub(crate) fn filters(&self) -> FilterCompiler<'_> {
        FilterCompiler::new(&self.names, self.registry, self.coercion)
    }

    /// `apoc.util.validatePredicate(NOT (p), <message>, [0])` for an allow or
    /// bind predicate.
    pub(crate) fn guard(&self, predicate: Option<Predicate>) -> Option<Predicate> {
        predicate.map(|p| validate_predicate(p, &self.config.auth.forbidden_message))
    }

    /// Filter, where rules and allow guard for a MATCH on `variable`.
    ///
    /// `extra_allow` holds field-level allow predicates, AND-ed with the
    /// type-level ones inside a single guard.
    pub(crate) fn match_constraints(
        &self,
        variable: &Variable,
        ty: &NodeType,
        filter: Option<&Value>,
        extra_allow: Option<Predicate>,
        operation: Operation,
    ) -> TranslateResult<Option<Predicate>> {
        let filter = self.filters().compile(filter, variable, ty)?;
        let auth = self.auth();
        let where_rules =
            auth.compile_rules(&ty.auth, operation, variable, RuleKind::Where, CompileOptions::default())?;
        let allow = auth.compile_rules(&ty.auth, operation, variable, RuleKind::Allow, CompileOptions::default())?;
        let allow = and(allow.into_iter().chain(extra_allow));

        Ok(and(filter.into_iter().chain(where_rules).chain(self.guard(allow))))
    }

    /// `WITH * ORDER BY ... SKIP ... LIMIT ...` for `options`, if any.
    pub(crate) fn page(&self, variable: &Variable, ty: &NodeType, options: &Options) -> TranslateResult<Query> {
        if options.is_empty() {
            return Ok(Query::new());
        }
        let mut with = With::star();
        for (name, direction) in &options.sort {
            let field = ty.field(name).ok_or_else(|| {
                TranslateError::MalformedInput(format!("cannot sort {} by {name}", ty.name))
            })?;
            with.order_by.push(SortItem {
                expr: Expr::prop(variable, field.property.as_str()),
                direction: *direction,
            });
        }
        with.skip = options.offset.map(|offset| Param::new(offset).into());
        with.limit = options.limit.map(|limit| Param::new(limit).into());
        Ok(Query::new().with(with))
    }

    /// Render with the configured indent.
    pub(crate) fn finish(&self, query: &Query) -> TranslateResult<CypherQuery> {
        let rendered = CypherRenderer::with_indent(self.config.query.indent).render(query)?;
        debug!(parameters = rendered.params.len(), "translated selection");
        Ok(CypherQuery {
            statement: rendered.cypher,
            parameters: rendered.params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeRegistryBuilder;
    use graft_config::ConfigError;
    use serde_json::json;
    use tracing_test::traced_test;

    fn translator() -> Translator {
        let registry = TypeRegistryBuilder::new()
            .add_json(json!([
                {
                    "name": "Movie",
                    "fields": [{"name": "title", "type": "String"}, {"name": "released", "type": "Int"}],
                    "relationships": [
                        {"name": "actors", "type": "ACTED_IN", "direction": "IN", "target": "Actor"}
                    ]
                },
                {
                    "name": "Actor",
                    "fields": [{"name": "name", "type": "String"}]
                }
            ]))
            .unwrap()
            .build()
            .unwrap();
        Translator::new(Arc::new(registry), GraftConfig::default()).unwrap()
    }

    // ============================================================================
    // Root reads
    // ============================================================================

    #[test]
    fn test_scalar_read() {
        let selection = SelectionNode::root("movies", "Movie").with_fields(["title"]);
        let query = translator().translate(&selection, &RequestContext::new()).unwrap();
        assert_eq!(query.statement, "MATCH (this:Movie)\nRETURN this { .title } AS this");
        assert!(query.parameters.is_empty());
    }

    #[test]
    fn test_read_with_relationship() {
        let selection = SelectionNode::root("movies", "Movie")
            .with_fields(["title"])
            .with_child(SelectionNode::new("actors").with_fields(["name"]));
        let query = translator().translate(&selection, &RequestContext::new()).unwrap();

        let expected = "MATCH (this:Movie)
CALL {
    WITH this
    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)
    WITH this1 { .name } AS this1
    RETURN collect(this1) AS var2
}
RETURN this { .title, actors: var2 } AS this";
        assert_eq!(query.statement, expected);
    }

    #[test]
    fn test_where_and_options() {
        let selection = SelectionNode::root("movies", "Movie")
            .with_argument("where", json!({"released_GT": 1990}))
            .with_argument("options", json!({"sort": [{"title": "DESC"}], "limit": 5}))
            .with_fields(["title"]);
        let query = translator().translate(&selection, &RequestContext::new()).unwrap();

        assert_eq!(
            query.statement,
            "MATCH (this:Movie)\nWHERE this.released > $param0\nWITH *\nORDER BY this.title DESC\nLIMIT $param1\nRETURN this { .title } AS this"
        );
        assert_eq!(query.parameters["param0"], json!(1990));
        assert_eq!(query.parameters["param1"], json!(5));
    }

    #[test]
    fn test_unknown_root_type() {
        let selection = SelectionNode::root("genres", "Genre");
        let err = translator().translate(&selection, &RequestContext::new()).unwrap_err();
        assert_eq!(err, TranslateError::MalformedInput("unknown type Genre".to_string()));
    }

    #[test]
    fn test_root_without_type() {
        let err = translator()
            .translate(&SelectionNode::new("movies"), &RequestContext::new())
            .unwrap_err();
        assert!(matches!(err, TranslateError::MalformedInput(_)));
    }

    #[test]
    fn test_sort_by_unknown_field() {
        let selection = SelectionNode::root("movies", "Movie")
            .with_argument("options", json!({"sort": [{"budget": "ASC"}]}))
            .with_fields(["title"]);
        let err = translator().translate(&selection, &RequestContext::new()).unwrap_err();
        assert!(matches!(err, TranslateError::MalformedInput(msg) if msg.contains("budget")));
    }

    #[test]
    fn test_custom_root_variable_and_indent() {
        let mut config = GraftConfig::default();
        config.query.root_variable = "m".to_string();
        config.query.indent = 2;
        let translator = Translator::new(translator().registry.clone(), config).unwrap();
        let selection = SelectionNode::root("movies", "Movie")
            .with_child(SelectionNode::new("actors").with_fields(["name"]));

        let statement = translator.translate(&selection, &RequestContext::new()).unwrap().statement;
        assert!(statement.starts_with("MATCH (m:Movie)\nCALL {\n  WITH m\n  MATCH (m)<-[this0:ACTED_IN]-(this1:Actor)"));
        assert!(statement.ends_with("RETURN m { actors: var2 } AS m"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let registry = translator().registry.clone();

        let mut spaced = GraftConfig::default();
        spaced.query.root_variable = "my var".to_string();
        assert!(matches!(Translator::new(registry.clone(), spaced), Err(ConfigError::Invalid(_))));

        let mut shallow = GraftConfig::default();
        shallow.query.max_depth = 0;
        assert!(matches!(Translator::new(registry, shallow), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_translator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Translator>();
    }

    #[test]
    #[traced_test]
    fn test_translation_logs_parameter_count() {
        let selection = SelectionNode::root("movies", "Movie")
            .with_argument("where", json!({"title": "Heat"}))
            .with_fields(["title"]);
        translator().translate(&selection, &RequestContext::new()).unwrap();
        assert!(logs_contain("translated selection"));
        assert!(logs_contain("parameters=1"));
    }
}
