//! End-to-end compilation tests
//!
//! Each fixture under tests/fixtures is compiled through the public pipeline
//! and the resulting schemas and models are checked field by field.

use std::path::PathBuf;

use docstore_schemas::{
    compile, extract_definitions, CompileOutput, Compiler, Document, EngineAdapter, FieldSpec,
    ModelRegistry, ReferenceKind, SchemaError, Violation,
};
use serde_json::{json, Value};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).unwrap()
}

fn compile_fixture(name: &str) -> CompileOutput {
    compile(fixture_bytes(name)).unwrap()
}

fn field_json(output: &CompileOutput, schema: &str, field: &str) -> Value {
    output.schemas[schema]
        .field(field)
        .unwrap_or_else(|| panic!("{}.{} missing", schema, field))
        .to_json()
}

// =============================================================================
// Swagger 2 petstore
// =============================================================================

#[test]
fn test_petstore_schema() {
    let output = compile_fixture("petstore.json");
    assert_eq!(
        output.schemas["Pet"].fields.to_json(),
        json!({
            "id": {"type": "Number", "required": true},
            "name": {"type": "String", "required": true},
            "dob": {"type": "Date"},
            "price": {"type": "Number"},
            "sold": {"type": "Boolean"},
            "friends": {"type": ["String"]},
            "favoriteNumbers": {"type": ["Number"]},
            "address": {"type": [{
                "addressLine1": {"type": "String"},
                "addressLine2": {"type": "String"}
            }]}
        })
    );
    assert_eq!(output.models.keys().collect::<Vec<_>>(), vec!["Error", "Pet"]);
}

#[test]
fn test_petstore_model_validation() {
    let output = compile_fixture("petstore.json");
    let pet = &output.models["Pet"];

    let violations = pet.validate(&json!({
        "id": 123,
        "name": "Fluffy",
        "dob": "2020-02-29T10:00:00Z",
        "price": 99.99,
        "sold": true,
        "friends": ["Barney", "Fido"],
        "favoriteNumbers": [1, 3, 7, 9],
        "address": [{"addressLine1": "1 Main St."}, {"addressLine1": "2 Main St."}],
        "notAKey": "test"
    }));
    assert_eq!(violations, vec![Violation::UnknownField { path: "notAKey".to_string() }]);

    let violations = pet.validate(&json!({"id": 123}));
    assert_eq!(violations, vec![Violation::MissingRequired { path: "name".to_string() }]);
}

#[test]
fn test_all_input_forms_agree() {
    let bytes = fixture_bytes("petstore.json");
    let text = String::from_utf8(bytes.clone()).unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    let from_bytes = compile(bytes).unwrap();
    let from_text = compile(text.as_str()).unwrap();
    let from_value = compile(value).unwrap();
    let from_path = compile(Document::from_path(fixture_path("petstore.json")).unwrap()).unwrap();

    assert_eq!(from_bytes.schemas, from_text.schemas);
    assert_eq!(from_bytes.schemas, from_value.schemas);
    assert_eq!(from_bytes.schemas, from_path.schemas);
    assert_eq!(
        from_bytes.models["Pet"].checksum,
        from_value.models["Pet"].checksum
    );
}

// =============================================================================
// OpenAPI 3 petstore
// =============================================================================

#[test]
fn test_openapi3_components() {
    let output = compile_fixture("petstore3.json");
    assert_eq!(field_json(&output, "Pet", "id"), json!({"type": "Number", "required": true}));
    assert_eq!(field_json(&output, "Pet", "name"), json!({"type": "String", "required": true}));
    // Non-circular references are embedded
    assert_eq!(field_json(&output, "Pet", "owner"), json!({"name": {"type": "String"}}));

    let pet = &output.models["Pet"];
    assert!(pet
        .validate(&json!({"id": 123, "name": "Gizmo", "owner": {"name": "Chris"}}))
        .is_empty());
}

#[test]
fn test_schema_options() {
    let output = compile_fixture("petstore3.json");
    let owner = &output.schemas["Owner"];
    assert_eq!(owner.options.get("timestamps"), Some(&json!(true)));
    assert_eq!(owner.options.get("versionKey"), Some(&json!("__custom")));
    assert!(output.schemas["Pet"].options.is_empty());
}

#[test]
fn test_default_values() {
    let output = compile_fixture("petstore3.json");
    assert_eq!(
        field_json(&output, "Error", "priority"),
        json!({"type": "String", "default": "high"})
    );
    assert_eq!(
        field_json(&output, "Error", "impacted_groups"),
        json!({"type": ["String"], "default": ["alpha", "beta"]})
    );
}

// =============================================================================
// People
// =============================================================================

#[test]
fn test_relations_to_external_collections() {
    let output = compile_fixture("person.swaggering.json");

    assert_eq!(field_json(&output, "Person", "cars"), json!([{"type": "ObjectId", "ref": "Car"}]));
    assert_eq!(
        field_json(&output, "Person", "houses"),
        json!([{"type": "ObjectId", "ref": "House"}])
    );

    let Some(FieldSpec::List(inner)) = output.schemas["Person"].field("cars") else {
        panic!("cars should be a list");
    };
    let reference = inner.as_field().unwrap().reference.as_ref().unwrap();
    assert_eq!(reference.kind, ReferenceKind::External);
    assert!(reference.is_array);
}

#[test]
fn test_embedded_contacts_and_passthrough_options() {
    let output = compile_fixture("person.swaggering.json");

    // The Contact expansion drops Contact's own required list
    assert_eq!(
        field_json(&output, "Person", "contacts"),
        json!([{
            "contactID": {"type": "ObjectId", "ref": "Person"},
            "priority": {"type": "String", "default": "high"}
        }])
    );
    assert_eq!(
        field_json(&output, "Person", "password"),
        json!({"type": "String", "select": false})
    );
    assert_eq!(field_json(&output, "Person", "other"), json!({"type": "Mixed"}));
    assert_eq!(
        field_json(&output, "Contact", "contactID"),
        json!({"type": "ObjectId", "ref": "Person", "required": true})
    );
}

#[test]
fn test_person_document_validation() {
    let output = compile_fixture("person.swaggering.json");
    let person = &output.models["Person"];

    let violations = person.validate(&json!({
        "login": "jb@mi6.gov",
        "firstName": "James",
        "lastName": "Bond",
        "password": "secret",
        "houses": ["0000000000000000000000ab"],
        "cars": ["0000000000000000000000ac"],
        "contacts": [{"_id": "0000000000000000000000ad", "contactID": "0000000000000000000000aa"}],
        "other": {"phoneNumber": "0123456789", "tags": ["sample", "list"]}
    }));
    assert!(violations.is_empty(), "{:?}", violations);

    let violations = person.validate(&json!({
        "login": "jb@mi6.gov",
        "contacts": [{"contactID": "not-an-id"}]
    }));
    assert_eq!(
        violations,
        vec![Violation::TypeMismatch {
            path: "contacts[0].contactID".to_string(),
            expected: "ObjectId".to_string()
        }]
    );
}

#[test]
fn test_reserved_fields_are_engine_owned() {
    let output = compile_fixture("person.json");
    let person = output.schemas["Person"].fields.fields().unwrap();
    assert!(!person.contains_key("_id"));
    assert!(!person.contains_key("__v"));

    // Nested documents drop them too
    assert_eq!(
        field_json(&output, "Person", "items"),
        json!({"type": [{"name": {"type": "String"}}]})
    );
}

#[test]
fn test_circular_references() {
    let output = compile_fixture("person.json");
    for parent in ["father", "mother"] {
        assert_eq!(
            field_json(&output, "Human", parent),
            json!({"type": "ObjectId", "ref": "Human"})
        );
    }
    let father = output.schemas["Human"].field("father").unwrap().as_field().unwrap();
    assert_eq!(father.reference.as_ref().unwrap().kind, ReferenceKind::Circular);
}

// =============================================================================
// Pipeline stages
// =============================================================================

#[test]
fn test_stages_compose() {
    let definitions = extract_definitions(fixture_bytes("petstore3.json")).unwrap();
    assert_eq!(definitions.keys().collect::<Vec<_>>(), vec!["Error", "Owner", "Pet"]);

    let compiler = Compiler::new();
    let schemas = compiler.build_schemas(&definitions).unwrap();

    let mut registry = ModelRegistry::new();
    let models = docstore_schemas::register_models(&schemas, &mut registry).unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(registry.len(), 3);

    // Re-registering the same schemas is a no-op
    let owner = registry.register(&schemas["Owner"]).unwrap();
    assert_eq!(owner.checksum, models["Owner"].checksum);
}

#[test]
fn test_missing_definitions() {
    let err = compile(json!({"swagger": "2.0", "paths": {}})).unwrap_err();
    assert!(matches!(err, SchemaError::MissingDefinitions));
}

#[test]
fn test_errors_name_the_property() {
    let err = compile(json!({"definitions": {
        "Pet": {"properties": {"weight": {"type": "number", "format": "int64"}}}
    }}))
    .unwrap_err();
    assert_eq!(err.property_path(), vec!["weight"]);
    assert_eq!(
        err.to_string(),
        r#"Exception processing key "weight" at: {"format":"int64","type":"number"}"#
    );
    assert_eq!(err.root_cause().to_string(), "Unrecognised schema format: int64");
}
