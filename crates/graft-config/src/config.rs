//! Configuration sections

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraftConfig {
    /// Authorization placement settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Statement shape settings.
    #[serde(default)]
    pub query: QueryConfig,
}

impl GraftConfig {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.auth.forbidden_message.is_empty() {
            return Err(ConfigError::Invalid("auth.forbidden_message must not be empty".to_string()));
        }
        if self.auth.roles_claim.is_empty() {
            return Err(ConfigError::Invalid("auth.roles_claim must not be empty".to_string()));
        }
        if !is_identifier(&self.query.root_variable) {
            return Err(ConfigError::Invalid(format!(
                "query.root_variable `{}` is not a plain identifier",
                self.query.root_variable
            )));
        }
        if self.query.max_depth == 0 {
            return Err(ConfigError::Invalid("query.max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// List predicate used when a rule must hold over related nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListPredicate {
    /// Every related node must satisfy the rule.
    #[default]
    All,
    /// At least one related node must satisfy the rule.
    Any,
}

/// Authorization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Quantifier for relationship entries in bind and where rules.
    ///
    /// Allow rules always use `any`.
    ///
    /// Default: "all"
    #[serde(default)]
    pub bind_predicate: ListPredicate,

    /// Message raised by the database when a guard fails.
    ///
    /// Default: "Forbidden"
    #[serde(default = "default_forbidden_message")]
    pub forbidden_message: String,

    /// Dotted JWT path holding the caller's roles when the request does not
    /// supply them directly.
    ///
    /// Default: "roles"
    #[serde(default = "default_roles_claim")]
    pub roles_claim: String,
}

fn default_forbidden_message() -> String {
    "Forbidden".to_string()
}

fn default_roles_claim() -> String {
    "roles".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bind_predicate: ListPredicate::default(),
            forbidden_message: default_forbidden_message(),
            roles_claim: default_roles_claim(),
        }
    }
}

/// Statement shape settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Name of the root node variable.
    ///
    /// Default: "this"
    #[serde(default = "default_root_variable")]
    pub root_variable: String,

    /// Deepest selection nesting accepted before translation fails.
    ///
    /// Default: 32
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Spaces per indentation level inside `CALL { }` bodies.
    ///
    /// Default: 4
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_root_variable() -> String {
    "this".to_string()
}

fn default_max_depth() -> usize {
    32
}

fn default_indent() -> usize {
    4
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            root_variable: default_root_variable(),
            max_depth: default_max_depth(),
            indent: default_indent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraftConfig::default();
        assert_eq!(config.auth.bind_predicate, ListPredicate::All);
        assert_eq!(config.auth.forbidden_message, "Forbidden");
        assert_eq!(config.auth.roles_claim, "roles");
        assert_eq!(config.query.root_variable, "this");
        assert_eq!(config.query.max_depth, 32);
        assert_eq!(config.query.indent, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_default() {
        let config: GraftConfig = toml::from_str("").unwrap();
        assert_eq!(config, GraftConfig::default());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let toml = r#"
            [auth]
            bind_predicate = "any"
        "#;
        let config: GraftConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.bind_predicate, ListPredicate::Any);
        assert_eq!(config.auth.forbidden_message, "Forbidden");
    }

    #[test]
    fn test_unknown_bind_predicate_rejected() {
        let toml = r#"
            [auth]
            bind_predicate = "some"
        "#;
        assert!(toml::from_str::<GraftConfig>(toml).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_root_variable() {
        let mut config = GraftConfig::default();
        config.query.root_variable = "my node".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let mut config = GraftConfig::default();
        config.query.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = GraftConfig::default();
        config.auth.forbidden_message = "Nope".to_string();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: GraftConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }
}
