//! End-to-end read translation against the fixture schema.

mod common;

use common::{fixture_translator, init_tracing, placeholders};
use graft_translate::{RequestContext, SelectionNode, TranslateError};
use serde_json::json;

fn authenticated(sub: &str) -> RequestContext {
    RequestContext::new().with_jwt(json!({"sub": sub}))
}

#[test]
fn test_filtered_paged_read_with_relationship() {
    init_tracing();
    let selection = SelectionNode::root("movies", "Movie")
        .with_argument("where", json!({"title_STARTS_WITH": "The"}))
        .with_argument("options", json!({"limit": 10, "offset": 5}))
        .with_fields(["title"])
        .with_child(
            SelectionNode::new("actors")
                .with_argument("where", json!({"name": "Keanu Reeves"}))
                .with_fields(["name"]),
        );

    let query = fixture_translator().translate(&selection, &RequestContext::new()).unwrap();

    insta::assert_snapshot!(query.statement, @r"
MATCH (this:Movie)
WHERE this.title STARTS WITH $param0
WITH *
SKIP $param1
LIMIT $param2
CALL {
    WITH this
    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)
    WHERE this1.name = $this1_param0
    WITH this1 { .name } AS this1
    RETURN collect(this1) AS var2
}
RETURN this { .title, actors: var2 } AS this
");
    insta::assert_json_snapshot!(query.parameters, @r#"
{
  "param0": "The",
  "param1": 5,
  "param2": 10,
  "this1_param0": "Keanu Reeves"
}
"#);
}

#[test]
fn test_where_rules_and_allow_guard() {
    init_tracing();
    let selection = SelectionNode::root("posts", "Post").with_fields(["content"]);
    let query = fixture_translator().translate(&selection, &authenticated("u1")).unwrap();

    insta::assert_snapshot!(query.statement, @r#"
MATCH (this:Post)
WHERE EXISTS { MATCH (this)<-[:HAS_POST]-(:User) } AND all(this0 IN [(this)<-[:HAS_POST]-(this0:User) | this0] WHERE this0.id IS NOT NULL AND this0.id = $param0) AND apoc.util.validatePredicate(NOT ("moderator" IN $auth.roles), "Forbidden", [0])
RETURN this { .content } AS this
"#);
    insta::assert_json_snapshot!(query.parameters, @r#"
{
  "param0": "u1",
  "auth": {
    "isAuthenticated": true,
    "jwt": {
      "sub": "u1"
    },
    "roles": []
  }
}
"#);
}

#[test]
fn test_field_allow_guards_root_match() {
    let selection = SelectionNode::root("users", "User").with_fields(["name", "email"]);
    let query = fixture_translator().translate(&selection, &authenticated("u1")).unwrap();

    assert_eq!(
        query.statement,
        "MATCH (this:User)\nWHERE apoc.util.validatePredicate(NOT (this.id IS NOT NULL AND this.id = $param0), \"Forbidden\", [0])\nRETURN this { .name, .email } AS this"
    );
    assert_eq!(query.parameters.len(), 1);
    assert_eq!(query.parameters["param0"], json!("u1"));
}

#[test]
fn test_unselected_field_rules_do_not_apply() {
    let selection = SelectionNode::root("users", "User").with_fields(["name"]);
    let query = fixture_translator().translate(&selection, &RequestContext::new()).unwrap();
    assert_eq!(query.statement, "MATCH (this:User)\nRETURN this { .name } AS this");
}

#[test]
fn test_unresolved_claim_fails_without_statement() {
    let selection = SelectionNode::root("posts", "Post").with_fields(["content"]);
    let err = fixture_translator()
        .translate(&selection, &RequestContext::new())
        .unwrap_err();
    assert!(matches!(err, TranslateError::Authentication(_)), "{err:?}");
}

#[test]
fn test_related_type_rules_apply_inside_subquery() {
    let selection = SelectionNode::root("users", "User")
        .with_fields(["name"])
        .with_child(SelectionNode::new("posts").with_fields(["content"]));
    let query = fixture_translator().translate(&selection, &authenticated("u1")).unwrap();

    assert!(query
        .statement
        .contains("    MATCH (this)-[this0:HAS_POST]->(this1:Post)\n    WHERE EXISTS { MATCH (this1)<-[:HAS_POST]-(:User) }"));
    assert!(query.parameters.contains_key("this1_param0"));
    assert!(query.parameters.contains_key("auth"));
}

#[test]
fn test_translation_is_deterministic() {
    let selection = SelectionNode::root("actors", "Actor")
        .with_argument("where", json!({"OR": [{"name": "A"}, {"name_CONTAINS": "B"}]}))
        .with_fields(["name"])
        .with_child(
            SelectionNode::new("movies")
                .with_argument("where", json!({"released_GTE": 1999, "actors_SOME": {"name": "C"}}))
                .with_fields(["title"]),
        );
    let translator = fixture_translator();
    let first = translator.translate(&selection, &RequestContext::new()).unwrap();
    let second = translator.translate(&selection, &RequestContext::new()).unwrap();

    assert_eq!(first, second);
    let mut keys: Vec<_> = first.parameters.keys().cloned().collect();
    let mut used = placeholders(&first.statement);
    keys.sort();
    used.sort();
    assert_eq!(keys, used);
}

#[test]
fn test_selection_deserializes_from_json() {
    let selection: SelectionNode = serde_json::from_value(json!({
        "name": "movies",
        "typeName": "Movie",
        "arguments": {"where": {"released": 1999}},
        "selections": [{"name": "title", "alias": "name"}]
    }))
    .unwrap();
    let query = fixture_translator().translate(&selection, &RequestContext::new()).unwrap();
    assert_eq!(
        query.statement,
        "MATCH (this:Movie)\nWHERE this.released = $param0\nRETURN this { name: this.title } AS this"
    );
}
