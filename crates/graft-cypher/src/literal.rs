//! Inline literals and identifier escaping.

use serde_json::Value;
use std::borrow::Cow;

/// A value rendered directly into the statement text.
///
/// Only used for schema constants (role names, error messages, fixed
/// integers). Request-supplied values always travel as [`crate::Param`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Double-quoted, escaped string literal.
    String(String),
    /// List literal.
    List(Vec<Literal>),
}

impl Literal {
    /// Convert a JSON scalar or array into a literal. Objects have no literal form.
    pub fn from_json(value: &Value) -> Option<Literal> {
        Some(match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(n.as_f64()?),
            },
            Value::String(s) => Literal::String(s.clone()),
            Value::Array(items) => {
                Literal::List(items.iter().map(Literal::from_json).collect::<Option<_>>()?)
            }
            Value::Object(_) => return None,
        })
    }

    /// Cypher text for this literal.
    pub fn to_cypher(&self) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) if f.is_nan() => "toFloat(\"NaN\")".to_string(),
            Literal::Float(f) if f.is_infinite() => {
                if f.is_sign_positive() {
                    "toFloat(\"Infinity\")".to_string()
                } else {
                    "toFloat(\"-Infinity\")".to_string()
                }
            }
            // Debug keeps the fractional part (`1.0`), Display would not.
            Literal::Float(f) => format!("{f:?}"),
            Literal::String(s) => escape_string(s),
            Literal::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(Literal::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(value: Vec<T>) -> Self {
        Literal::List(value.into_iter().map(Into::into).collect())
    }
}

/// Double-quote a string, escaping backslashes, quotes and control characters.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Backtick-quote an identifier unless it is a plain `[A-Za-z_][A-Za-z0-9_]*` name.
pub fn escape_identifier(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let simple = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if simple {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_scalar_literals() {
        assert_eq!(Literal::Null.to_cypher(), "NULL");
        assert_eq!(Literal::Bool(true).to_cypher(), "true");
        assert_eq!(Literal::Int(-3).to_cypher(), "-3");
        assert_eq!(Literal::Float(1.0).to_cypher(), "1.0");
        assert_eq!(Literal::Float(2.5).to_cypher(), "2.5");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(Literal::from("admin").to_cypher(), "\"admin\"");
        assert_eq!(
            Literal::from("say \"hi\"\\").to_cypher(),
            "\"say \\\"hi\\\"\\\\\""
        );
        assert_eq!(Literal::from("a\nb").to_cypher(), "\"a\\nb\"");
    }

    #[test]
    fn test_list_literal() {
        let list = Literal::from(vec!["admin", "editor"]);
        assert_eq!(list.to_cypher(), "[\"admin\", \"editor\"]");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Literal::from_json(&json!(3)), Some(Literal::Int(3)));
        assert_eq!(
            Literal::from_json(&json!([1, "a"])),
            Some(Literal::List(vec![Literal::Int(1), Literal::from("a")]))
        );
        assert_eq!(Literal::from_json(&json!({"a": 1})), None);
    }

    #[test_case("Movie", "Movie" ; "plain label")]
    #[test_case("_private1", "_private1" ; "underscore and digits")]
    #[test_case("My Label", "`My Label`" ; "space")]
    #[test_case("1st", "`1st`" ; "leading digit")]
    #[test_case("we`ird", "`we``ird`" ; "embedded backtick")]
    fn test_escape_identifier(input: &str, expected: &str) {
        assert_eq!(escape_identifier(input), expected);
    }
}
