//! Lowering of resolved rules into predicates over pattern variables.

use super::rule::{AuthRule, Combinator, Operation, RuleBody, RuleEntry, RuleKind, RuleSection, RuleValue};
use crate::coerce::{param_expr, ScalarCoercion};
use crate::context::RequestContext;
use crate::error::{TranslateError, TranslateResult};
use graft_config::{AuthConfig, ListPredicate};
use graft_cypher::{
    and, exists, in_list, is_not_null, or, quantified, Direction, Expr, NameAuthority, NodePattern, Param, Pattern,
    PatternComprehension, Predicate, Quantifier, RelationshipPattern, Variable,
};
use serde_json::Value;
use tracing::trace;

/// Checks a compile may leave out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub skip_roles: bool,
    pub skip_is_authenticated: bool,
}

impl CompileOptions {
    /// Skip both caller checks; only data conditions remain.
    pub fn data_only() -> Self {
        Self {
            skip_roles: true,
            skip_is_authenticated: true,
        }
    }
}

/// Compiles rules for one translation.
///
/// All compiled predicates read caller facts from the single `$auth`
/// parameter the compiler was given, and mint variables from the
/// translation's [`NameAuthority`].
pub struct AuthCompiler<'a> {
    names: &'a NameAuthority,
    context: &'a RequestContext,
    auth: &'a Param,
    config: &'a AuthConfig,
    coercion: &'a dyn ScalarCoercion,
}

impl<'a> AuthCompiler<'a> {
    pub fn new(
        names: &'a NameAuthority,
        context: &'a RequestContext,
        auth: &'a Param,
        config: &'a AuthConfig,
        coercion: &'a dyn ScalarCoercion,
    ) -> Self {
        Self {
            names,
            context,
            auth,
            config,
            coercion,
        }
    }

    /// Compile the rules of a type or field that apply to `operation`.
    ///
    /// Allow and bind OR the rules together: any granting rule suffices.
    /// Where only considers rules with a where section, without caller checks.
    pub fn compile_rules(
        &self,
        rules: &[AuthRule],
        operation: Operation,
        variable: &Variable,
        kind: RuleKind,
        options: CompileOptions,
    ) -> TranslateResult<Option<Predicate>> {
        let mut compiled = Vec::new();
        for rule in rules.iter().filter(|r| r.applies_to(operation)) {
            let predicate = match kind {
                RuleKind::Where if rule.filter.is_none() => continue,
                RuleKind::Where => self.compile_rule(rule, variable, kind, CompileOptions::data_only(), false)?,
                RuleKind::Allow | RuleKind::Bind => self.compile_rule(rule, variable, kind, options, false)?,
            };
            compiled.extend(predicate);
        }
        trace!(?operation, ?kind, rules = rules.len(), compiled = compiled.len(), "compiled rule set");
        Ok(or(compiled))
    }

    /// Compile one rule (roles, authentication, section, nested AND/OR).
    pub fn compile_rule(
        &self,
        rule: &AuthRule,
        variable: &Variable,
        kind: RuleKind,
        options: CompileOptions,
        inherited_allow_unauthenticated: bool,
    ) -> TranslateResult<Option<Predicate>> {
        let allow_unauthenticated = rule.allow_unauthenticated || inherited_allow_unauthenticated;
        let mut parts = Vec::new();

        if !options.skip_roles {
            if let Some(roles) = &rule.roles {
                parts.extend(or(roles.iter().map(|role| self.role_check(role))));
            }
        }

        if !options.skip_is_authenticated {
            if let Some(expected) = rule.is_authenticated {
                parts.push(graft_cypher::eq(
                    Expr::param(self.auth.clone()).property("isAuthenticated"),
                    Expr::literal(expected),
                ));
            }
        }

        match rule.section(kind) {
            Some(RuleSection::Any) => parts.push(Predicate::Literal(true)),
            Some(RuleSection::Body(body)) => {
                parts.extend(self.compile_body(body, variable, kind, allow_unauthenticated)?);
            }
            None => {}
        }

        for (nested, combinator) in [(&rule.and, Combinator::And), (&rule.or, Combinator::Or)] {
            if nested.is_empty() {
                continue;
            }
            let mut compiled = Vec::with_capacity(nested.len());
            for inner in nested {
                compiled.extend(self.compile_rule(inner, variable, kind, options, allow_unauthenticated)?);
            }
            parts.extend(combine(combinator, compiled));
        }

        Ok(and(parts))
    }

    fn role_check(&self, role: &str) -> Predicate {
        in_list(Expr::literal(role), Expr::param(self.auth.clone()).property("roles"))
    }

    /// Compile a rule body against `variable`; entries are AND-ed.
    pub fn compile_body(
        &self,
        body: &RuleBody,
        variable: &Variable,
        kind: RuleKind,
        allow_unauthenticated: bool,
    ) -> TranslateResult<Option<Predicate>> {
        let mut parts = Vec::with_capacity(body.entries.len());
        for entry in &body.entries {
            parts.extend(self.compile_entry(entry, variable, kind, allow_unauthenticated)?);
        }
        Ok(and(parts))
    }

    fn compile_entry(
        &self,
        entry: &RuleEntry,
        variable: &Variable,
        kind: RuleKind,
        allow_unauthenticated: bool,
    ) -> TranslateResult<Option<Predicate>> {
        match entry {
            RuleEntry::Combinator { op, bodies } => {
                let mut compiled = Vec::with_capacity(bodies.len());
                for body in bodies {
                    compiled.extend(self.compile_body(body, variable, kind, allow_unauthenticated)?);
                }
                Ok(combine(*op, compiled))
            }
            RuleEntry::Scalar {
                field,
                property,
                ty,
                value,
            } => {
                let value = self.resolve_value(value, allow_unauthenticated)?;
                let value = self
                    .coercion
                    .coerce(*ty, &value)
                    .map_err(|e| TranslateError::MalformedInput(format!("rule value for {field}: {e}")))?;
                let target = Expr::prop(variable, property.as_str());
                let param = param_expr(*ty, false, Param::new(value));
                Ok(and([is_not_null(target.clone()), graft_cypher::eq(target, param)]))
            }
            RuleEntry::Relationship {
                field,
                rel_type,
                direction,
                target_labels,
                body,
            } => {
                let related = self.names.fresh("this");
                let inner = self
                    .compile_body(body, &related, kind, allow_unauthenticated)?
                    .ok_or_else(|| {
                        TranslateError::InvalidPredicate(format!("relationship rule on {field} has no conditions"))
                    })?;
                Ok(Some(self.relationship_predicate(
                    variable,
                    &related,
                    rel_type,
                    *direction,
                    target_labels,
                    kind,
                    inner,
                )))
            }
        }
    }

    fn resolve_value(&self, value: &RuleValue, allow_unauthenticated: bool) -> TranslateResult<Value> {
        match value {
            RuleValue::Literal(literal) => Ok(literal.clone()),
            RuleValue::Context(reference) => match reference.resolve(self.context) {
                Some(resolved) => Ok(resolved.clone()),
                // Null never equals anything, so the comparison fails closed.
                None if allow_unauthenticated => Ok(Value::Null),
                None => Err(TranslateError::Authentication(format!("{reference} is not set"))),
            },
        }
    }

    /// `EXISTS { MATCH (source)-[:T]->(:Target) } AND
    /// q(v IN [(source)-[:T]->(v:Target) | v] WHERE inner)`
    #[allow(clippy::too_many_arguments)]
    fn relationship_predicate(
        &self,
        source: &Variable,
        related: &Variable,
        rel_type: &str,
        direction: Direction,
        target_labels: &[String],
        kind: RuleKind,
        inner: Predicate,
    ) -> Predicate {
        let hop = RelationshipPattern::new(rel_type, direction);
        let existence = Pattern::node(NodePattern::new(source)).related(
            hop.clone(),
            NodePattern::anonymous().with_labels(target_labels.iter().cloned()),
        );
        let matches = Pattern::node(NodePattern::new(source)).related(
            hop,
            NodePattern::new(related).with_labels(target_labels.iter().cloned()),
        );
        let list = Expr::PatternComprehension(Box::new(PatternComprehension {
            pattern: matches,
            predicate: None,
            projection: Expr::var(related),
        }));

        let quantifier = match kind {
            RuleKind::Allow => Quantifier::Any,
            RuleKind::Bind | RuleKind::Where => match self.config.bind_predicate {
                ListPredicate::All => Quantifier::All,
                ListPredicate::Any => Quantifier::Any,
            },
        };

        Predicate::And(vec![
            exists(existence, None),
            quantified(quantifier, related, list, inner),
        ])
    }
}

fn combine(op: Combinator, parts: Vec<Predicate>) -> Option<Predicate> {
    match op {
        Combinator::And => and(parts),
        Combinator::Or => or(parts),
    }
}
