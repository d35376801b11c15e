//! Per-request caller context.

use serde::Deserialize;
use serde_json::{json, Value};

/// What the caller brings to one translation: decoded JWT claims, free-form
/// context values and optionally an explicit role list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    /// Decoded JWT payload; absent for unauthenticated callers.
    #[serde(default)]
    pub jwt: Option<Value>,

    /// Values addressable as `$context.<path>`.
    #[serde(default)]
    pub context: Value,

    /// Explicit roles; when absent, roles are read from the JWT.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl RequestContext {
    /// An unauthenticated request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach JWT claims.
    pub fn with_jwt(mut self, jwt: Value) -> Self {
        self.jwt = Some(jwt);
        self
    }

    /// Attach context values.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Attach an explicit role list.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Authenticated means a JWT is present.
    pub fn is_authenticated(&self) -> bool {
        self.jwt.is_some()
    }

    /// The caller's roles: the explicit list, else the JWT claim at
    /// `roles_claim`, else none.
    pub fn roles(&self, roles_claim: &str) -> Vec<String> {
        if let Some(roles) = &self.roles {
            return roles.clone();
        }
        let path = split_path(roles_claim);
        match self.jwt.as_ref().and_then(|jwt| lookup(jwt, &path)) {
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }

    /// Value bound to `$auth`.
    pub fn auth_value(&self, roles_claim: &str) -> Value {
        json!({
            "isAuthenticated": self.is_authenticated(),
            "roles": self.roles(roles_claim),
            "jwt": self.jwt.clone().unwrap_or_else(|| json!({})),
        })
    }
}

/// Split a dotted path; `\.` is a literal dot inside a segment.
pub(crate) fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}

/// Walk `path` through objects (by key) and arrays (by index).
pub(crate) fn lookup<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_with_escaped_dot() {
        assert_eq!(split_path("sub"), vec!["sub"]);
        assert_eq!(split_path("a.b"), vec!["a", "b"]);
        assert_eq!(split_path(r"https://example\.com/roles"), vec!["https://example.com/roles"]);
        assert_eq!(split_path(r"realm\.access.roles"), vec!["realm.access", "roles"]);
    }

    #[test]
    fn test_lookup_objects_and_arrays() {
        let value = json!({"a": {"b": [10, {"c": "x"}]}});
        let path = split_path("a.b.1.c");
        assert_eq!(lookup(&value, &path), Some(&json!("x")));
        assert_eq!(lookup(&value, &split_path("a.z")), None);
    }

    #[test]
    fn test_roles_from_explicit_list_win() {
        let ctx = RequestContext::new()
            .with_jwt(json!({"roles": ["user"]}))
            .with_roles(["admin"]);
        assert_eq!(ctx.roles("roles"), vec!["admin"]);
    }

    #[test]
    fn test_roles_from_nested_claim() {
        let ctx = RequestContext::new().with_jwt(json!({"realm": {"roles": ["editor", "viewer"]}}));
        assert_eq!(ctx.roles("realm.roles"), vec!["editor", "viewer"]);
        assert!(ctx.roles("roles").is_empty());
    }

    #[test]
    fn test_auth_value_for_anonymous_caller() {
        let value = RequestContext::new().auth_value("roles");
        assert_eq!(value, json!({"isAuthenticated": false, "roles": [], "jwt": {}}));
    }
}
