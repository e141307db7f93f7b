//! Schema Document Tests
//!
//! Loading, `$ref` resolution across files, reference cycles and
//! validation against the fixture schemas.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use request_types::schema::ReferenceCycle;
use request_types::{Error, ReferenceGraph, Schema, SchemaStore};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn annotation() -> Schema {
    Schema::from_file(fixture("annotation.yaml")).unwrap()
}

fn base_uri() -> String {
    let dir = fixture("").canonicalize().unwrap();
    url::Url::from_directory_path(dir).unwrap().to_string()
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_from_file_error() {
    let err = Schema::from_file(fixture("bad_yaml.yaml")).unwrap_err();
    match err {
        Error::SchemaLoading { path, .. } => assert!(path.ends_with("bad_yaml.yaml"), "{path}"),
        other => panic!("Expected SchemaLoading, got {other:?}"),
    }
}

#[test]
fn test_schema_dir_is_file_parent() {
    let schema = annotation();
    assert_eq!(
        schema.schema_dir().unwrap(),
        fixture("").canonicalize().unwrap().as_path()
    );
    assert_eq!(schema.resolver().base_uri().as_str(), base_uri());
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_resolve() {
    let (url, value) = annotation().resolver().resolve("#/test_ref", None).unwrap();
    assert_eq!(url.as_str(), format!("{}#/definitions/annotation_id", base_uri()));
    assert_eq!(
        value,
        json!({"description": "Auto-increment ID.", "type": "integer", "example": 1})
    );
}

#[test]
fn test_resolve_external() {
    let schema = annotation();
    let (url, value) = schema.resolver().resolve("#/properties/auth", None).unwrap();
    assert_eq!(url.as_str(), format!("{}common.yaml#/definitions/auth", base_uri()));
    assert_eq!(
        value,
        json!({
            "description": "auth token",
            "type": ["string"],
            "example": "eb25f25becca416092752b0f457f1271",
        })
    );
    assert_eq!(schema.resolver().cached_documents(), 1);
}

#[test]
fn test_resolve_error() {
    let message = annotation().resolve("#/invalid_ref").unwrap_err().to_string();
    assert!(
        message.starts_with("Unresolvable JSON pointer: 'invalid_ref' (from "),
        "{message}"
    );
}

#[test]
fn test_resolve_error_chain() {
    let err = annotation().resolve("#/invalid_ref_chain_1").unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert_eq!(
        err.to_string(),
        "Unresolvable JSON pointer: 'invalid_ref_chain_3' \
         (from / => /#/invalid_ref_chain_1 => /#/invalid_ref_chain_2)"
    );
}

#[test]
fn test_resolve_error_circular_chain() {
    let err = annotation().resolve("#/circular_ref_chain_1").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Circular reference in schema: / => /#/circular_ref_chain_1 => \
         /#/circular_ref_chain_2 => /#/circular_ref_chain_3 => /#/circular_ref_chain_1"
    );
}

#[test]
fn test_resolve_missing_external_document() {
    let dir = fixture("").canonicalize().unwrap();
    let schema = Schema::new(
        json!({"definitions": {"gone": {"$ref": "missing.yaml#/definitions/x"}}}),
        Some(dir.as_path()),
    )
    .unwrap();
    let message = schema.resolve("#/definitions/gone").unwrap_err().to_string();
    assert!(message.starts_with("Unresolvable reference '"), "{message}");
    assert!(message.contains("missing.yaml"), "{message}");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate() {
    let schema = annotation();
    let validator = schema.validator(None).unwrap();
    let value = json!({"annotation_id": 1, "name": "hodor"});
    assert!(schema.validate(&value, &validator).is_ok());
    assert!(schema
        .validate(&json!({"annotation_id": 1, "name": null}), &validator)
        .is_ok());
}

#[test]
fn test_validate_json_with_key_from_ref() {
    let schema = annotation();
    let validator = schema.validator(None).unwrap();
    let body = r#"{"annotation_id": 1, "name": "hodor", "auth": "abcd"}"#;
    assert_eq!(
        schema.validate_json(body, &validator).unwrap(),
        json!({"annotation_id": 1, "name": "hodor", "auth": "abcd"})
    );

    let err = schema
        .validate_json(r#"{"annotation_id": 1, "name": "hodor", "auth": 1}"#, &validator)
        .unwrap_err();
    let errors = err.field_errors().unwrap();
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["auth"]);
    assert!(errors["auth"].contains("is not of type"), "{}", errors["auth"]);
}

#[test]
fn test_validate_json_error_invalid_data_multiple_errors() {
    let schema = annotation();
    let validator = schema.validator(None).unwrap();
    let err = schema
        .validate_json(r#"{"annotation_id": "hodor", "name": 1}"#, &validator)
        .unwrap_err();
    assert!(matches!(err, Error::SchemaValidation { .. }));
    assert!(err.to_string().contains("is not of type"), "{err}");

    let errors = err.field_errors().unwrap();
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["annotation_id", "name"]);
}

#[test]
fn test_validate_json_error_invalid_json() {
    let schema = annotation();
    let validator = schema.validator(None).unwrap();
    let err = schema.validate_json("bad json", &validator).unwrap_err();
    assert!(err.to_string().starts_with("Error parsing JSON"));
}

#[test]
fn test_request_schema_validates_external_definitions() {
    let schema = annotation();
    let request = schema.request_schema(&["page", "name"], &["page"]).unwrap();
    let validator = schema.validator(Some(&request)).unwrap();

    assert!(schema.validate(&json!({"page": 2}), &validator).is_ok());
    let err = schema
        .validate(&json!({"page": 0, "name": "x"}), &validator)
        .unwrap_err();
    assert_eq!(err.field_errors().unwrap().keys().collect::<Vec<_>>(), vec!["page"]);
}

// =============================================================================
// Reference Graph
// =============================================================================

#[test]
fn test_alias_cycles_reported_before_recursive_types() {
    let schema = Schema::from_file(fixture("cycles.yaml")).unwrap();
    let graph = ReferenceGraph::from_schema(&schema);
    assert_eq!(graph.node_count(), 4);
    assert_eq!(
        graph.cycles(),
        vec![
            ReferenceCycle {
                members: vec!["a".to_string(), "b".to_string()],
                alias_only: true,
            },
            ReferenceCycle {
                members: vec!["node".to_string()],
                alias_only: false,
            },
        ]
    );

    // Recursive types still resolve; alias cycles never do
    assert!(schema.resolve("#/definitions/node").is_ok());
    let message = schema.resolve("#/definitions/a").unwrap_err().to_string();
    assert!(message.starts_with("Circular reference in schema: "), "{message}");
}

// =============================================================================
// Store
// =============================================================================

#[test]
fn test_store_definition_types() {
    let store = SchemaStore::new();
    let path = fixture("annotation.yaml");

    let page = store.definition_type(&path, "page").unwrap();
    assert_eq!(page.description(), "Page number of a listing.");
    assert_eq!(page.parse_str("2", "page").unwrap(), json!(2));
    assert_eq!(page.validate(&json!(0)).unwrap_err().code(), "schema");

    let tags = store.definition_type(&path, "tags").unwrap();
    assert_eq!(tags.example(), Some(json!([{"label": "important"}])));
    let err = tags
        .validate(&json!([{"label": "a"}, {"label": 1, "extra": true}]))
        .unwrap_err();
    let keys: Vec<String> = err.errors().unwrap().keys().map(ToString::to_string).collect();
    assert_eq!(keys, vec!["1"]);

    assert_eq!(store.schema_count(), 1);
    assert_eq!(store.type_count(), 2);
}

#[test]
fn test_store_load_dir() {
    let store = SchemaStore::new();
    let err = store.load_dir(fixture("")).unwrap_err();
    assert!(matches!(err, Error::SchemaLoading { .. }));

    let dir = tempfile::tempdir().unwrap();
    for name in ["annotation.yaml", "common.yaml"] {
        std::fs::copy(fixture(name), dir.path().join(name)).unwrap();
    }
    let loaded = store.load_dir(dir.path()).unwrap();
    let names: Vec<_> = loaded
        .iter()
        .filter_map(|p| p.file_name()?.to_str())
        .collect();
    assert_eq!(names, vec!["annotation.yaml", "common.yaml"]);
}
