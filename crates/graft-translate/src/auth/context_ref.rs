//! `$jwt.<path>` and `$context.<path>` references in rule values.

use crate::context::{lookup, split_path, RequestContext};
use serde_json::Value;
use std::fmt;

/// Where a reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Jwt,
    Context,
}

/// A rule value resolved from the request at translation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextReference {
    pub source: ContextSource,
    pub path: Vec<String>,
}

impl ContextReference {
    /// Parse `$jwt.a.b` / `$context.a\.b`; anything else is not a reference.
    pub fn parse(value: &str) -> Option<Self> {
        let (source, path) = if let Some(path) = value.strip_prefix("$jwt.") {
            (ContextSource::Jwt, path)
        } else if let Some(path) = value.strip_prefix("$context.") {
            (ContextSource::Context, path)
        } else {
            return None;
        };
        if path.is_empty() {
            return None;
        }
        Some(Self {
            source,
            path: split_path(path),
        })
    }

    /// The referenced value; JSON `null` counts as unresolved.
    pub fn resolve<'c>(&self, context: &'c RequestContext) -> Option<&'c Value> {
        let root = match self.source {
            ContextSource::Jwt => context.jwt.as_ref()?,
            ContextSource::Context => &context.context,
        };
        lookup(root, &self.path).filter(|v| !v.is_null())
    }
}

impl fmt::Display for ContextReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            ContextSource::Jwt => "$jwt",
            ContextSource::Context => "$context",
        };
        let path: Vec<String> = self.path.iter().map(|s| s.replace('.', "\\.")).collect();
        write!(f, "{source}.{}", path.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sources() {
        let jwt = ContextReference::parse("$jwt.sub").unwrap();
        assert_eq!(jwt.source, ContextSource::Jwt);
        assert_eq!(jwt.path, vec!["sub"]);

        let ctx = ContextReference::parse("$context.tenant.id").unwrap();
        assert_eq!(ctx.source, ContextSource::Context);
        assert_eq!(ctx.path, vec!["tenant", "id"]);
    }

    #[test]
    fn test_plain_strings_are_not_references() {
        assert!(ContextReference::parse("sub").is_none());
        assert!(ContextReference::parse("$jwt").is_none());
        assert!(ContextReference::parse("$jwt.").is_none());
        assert!(ContextReference::parse("$cypherParams.x").is_none());
    }

    #[test]
    fn test_display_round_trips_escapes() {
        let raw = r"$jwt.https://example\.com/id";
        let reference = ContextReference::parse(raw).unwrap();
        assert_eq!(reference.path, vec!["https://example.com/id"]);
        assert_eq!(reference.to_string(), raw);
    }

    #[test]
    fn test_resolve() {
        let context = RequestContext::new()
            .with_jwt(json!({"sub": "id-01", "gone": null}))
            .with_context(json!({"tenant": {"id": 7}}));

        let sub = ContextReference::parse("$jwt.sub").unwrap();
        assert_eq!(sub.resolve(&context), Some(&json!("id-01")));

        let tenant = ContextReference::parse("$context.tenant.id").unwrap();
        assert_eq!(tenant.resolve(&context), Some(&json!(7)));

        assert!(ContextReference::parse("$jwt.gone").unwrap().resolve(&context).is_none());
        assert!(ContextReference::parse("$jwt.sub").unwrap().resolve(&RequestContext::new()).is_none());
    }
}
