//! The resolved selection tree a translation consumes.

use crate::error::{TranslateError, TranslateResult};
use graft_cypher::SortDirection;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A requested field with its arguments and child selections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionNode {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Node type of the field; required on the root.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub selections: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A root selection of `type_name`.
    pub fn root(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(name)
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_child(mut self, child: SelectionNode) -> Self {
        self.selections.push(child);
        self
    }

    /// Add scalar children by name.
    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections.extend(names.into_iter().map(SelectionNode::new));
        self
    }

    /// Key the field appears under in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|v| !v.is_null())
    }

    /// The `where` argument, if any.
    pub fn where_argument(&self) -> Option<&Value> {
        self.argument("where")
    }

    /// `directed: false` asks for undirected relationship traversal.
    pub fn directed(&self) -> TranslateResult<bool> {
        match self.argument("directed") {
            None => Ok(true),
            Some(Value::Bool(directed)) => Ok(*directed),
            Some(other) => Err(TranslateError::MalformedInput(format!(
                "directed on {} must be a boolean, got {other}",
                self.name
            ))),
        }
    }

    /// The parsed `options` argument.
    pub fn options(&self) -> TranslateResult<Options> {
        match self.argument("options") {
            None => Ok(Options::default()),
            Some(value) => Options::parse(value),
        }
    }
}

/// Sorting and pagination requested through `options`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Field names with their direction, in priority order.
    pub sort: Vec<(String, SortDirection)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Options {
    /// Parse `{sort: [{field: "ASC"|"DESC"}], limit, offset}`.
    pub fn parse(value: &Value) -> TranslateResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TranslateError::MalformedInput(format!("options must be an object, got {value}")))?;

        let mut options = Options::default();
        for (key, value) in object {
            match key.as_str() {
                "sort" => options.sort = parse_sort(value)?,
                "limit" => options.limit = parse_count("limit", value)?,
                "offset" => options.offset = parse_count("offset", value)?,
                other => return Err(TranslateError::MalformedInput(format!("unknown option {other}"))),
            }
        }
        Ok(options)
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.limit.is_none() && self.offset.is_none()
    }
}

fn parse_sort(value: &Value) -> TranslateResult<Vec<(String, SortDirection)>> {
    let malformed = || TranslateError::MalformedInput(format!("sort must be a list of {{field: ASC|DESC}}, got {value}"));
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err(malformed()),
    };

    let mut sort = Vec::new();
    for item in items {
        for (field, direction) in item.as_object().ok_or_else(malformed)? {
            let direction = match direction.as_str() {
                Some("ASC") => SortDirection::Asc,
                Some("DESC") => SortDirection::Desc,
                _ => return Err(malformed()),
            };
            sort.push((field.clone(), direction));
        }
    }
    Ok(sort)
}

fn parse_count(name: &str, value: &Value) -> TranslateResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_i64() {
            Some(count) if count >= 0 => Ok(Some(count)),
            _ => Err(TranslateError::MalformedInput(format!("{name} must be a non-negative integer"))),
        },
        _ => Err(TranslateError::MalformedInput(format!("{name} must be a non-negative integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_key_prefers_alias() {
        let plain = SelectionNode::new("title");
        assert_eq!(plain.response_key(), "title");
        assert_eq!(plain.with_alias("name").response_key(), "name");
    }

    #[test]
    fn test_null_arguments_are_absent() {
        let node = SelectionNode::new("movies").with_argument("where", Value::Null);
        assert!(node.where_argument().is_none());
    }

    #[test]
    fn test_options_parse() {
        let options = Options::parse(&json!({
            "sort": [{"title": "DESC"}, {"year": "ASC"}],
            "limit": 10,
            "offset": 5
        }))
        .unwrap();
        assert_eq!(
            options.sort,
            vec![
                ("title".to_string(), SortDirection::Desc),
                ("year".to_string(), SortDirection::Asc)
            ]
        );
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.offset, Some(5));
    }

    #[test]
    fn test_options_reject_bad_shapes() {
        assert!(Options::parse(&json!({"limit": -1})).is_err());
        assert!(Options::parse(&json!({"limit": "10"})).is_err());
        assert!(Options::parse(&json!({"sort": [{"title": "UP"}]})).is_err());
        assert!(Options::parse(&json!({"page": 1})).is_err());
        assert!(Options::parse(&json!([])).is_err());
    }

    #[test]
    fn test_directed_argument() {
        let node = SelectionNode::new("actors").with_argument("directed", json!(false));
        assert!(!node.directed().unwrap());
        assert!(SelectionNode::new("actors").directed().unwrap());
        let bad = SelectionNode::new("actors").with_argument("directed", json!("no"));
        assert!(bad.directed().is_err());
    }

    #[test]
    fn test_deserialize_selection_tree() {
        let node: SelectionNode = serde_json::from_value(json!({
            "name": "movies",
            "typeName": "Movie",
            "arguments": {"where": {"title": "Heat"}},
            "selections": [{"name": "title"}, {"name": "actors", "selections": [{"name": "name"}]}]
        }))
        .unwrap();
        assert_eq!(node.type_name.as_deref(), Some("Movie"));
        assert_eq!(node.selections.len(), 2);
        assert_eq!(node.selections[1].selections[0].name, "name");
    }
}
