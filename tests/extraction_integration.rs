//! Extraction over the fixture files in testdata/.

use std::path::PathBuf;

use driftcheck::{default_registry, extract_all, SourceKind};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn read(relative: &str) -> String {
    std::fs::read_to_string(testdata_path().join(relative))
        .unwrap_or_else(|e| panic!("failed to read {}: {}", relative, e))
}

fn names(sigs: &[driftcheck::FunctionSignature]) -> Vec<&str> {
    sigs.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn test_markdown_fixture() {
    let sigs = driftcheck::extract(&read("shop/README.md"), "shop/README.md");
    assert_eq!(names(&sigs), ["calculate_total", "send_email"]);

    let total = &sigs[0];
    let params: Vec<_> = total.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, ["price", "quantity", "tax_rate"]);
    assert_eq!(total.parameters[1].type_annotation.as_deref(), Some("int"));
    assert_eq!(total.return_type.as_deref(), Some("float"));
    assert_eq!(total.location.file, "shop/README.md");
}

#[cfg(feature = "tree-sitter")]
#[test]
fn test_python_fixture() {
    let sigs = driftcheck::extract(&read("shop/cart.py"), "shop/cart.py");
    assert_eq!(names(&sigs), ["calculate_total"]);
    let sig = &sigs[0];
    assert_eq!(sig.location.line, 4);
    assert_eq!(sig.parameters[2].name, "discount");
    assert_eq!(sig.parameters[2].default.as_deref(), Some("0.0"));
    assert_eq!(
        sig.documentation.as_deref(),
        Some("Compute the order total after discount.")
    );
}

#[test]
fn test_javascript_and_docs_agree_on_names() {
    let code = driftcheck::extract(&read("web/cart.js"), "web/cart.js");
    let docs = driftcheck::extract(&read("web/docs/API.md"), "web/docs/API.md");
    assert_eq!(names(&code), ["calculateTotal", "formatPrice"]);
    assert_eq!(names(&docs), ["calculateTotal", "formatPrice"]);
    assert_eq!(docs[1].parameters[1].default.as_deref(), Some("USD"));
}

#[test]
fn test_openapi_fixture() {
    let sigs = driftcheck::extract(&read("api/openapi.json"), "api/openapi.json");
    let mut found = names(&sigs);
    found.sort();
    assert_eq!(found, ["createOrder", "getOrder"]);
    let get = sigs.iter().find(|s| s.name == "getOrder").unwrap();
    assert_eq!(get.parameters[0].type_annotation.as_deref(), Some("integer"));
}

#[test]
fn test_extract_all_concatenates_in_order() {
    let files = vec![
        ("web/docs/API.md".to_string(), read("web/docs/API.md")),
        ("notes.txt".to_string(), "calculateTotal(a, b)".to_string()),
        ("shop/README.md".to_string(), read("shop/README.md")),
    ];
    let sigs = extract_all(&files);
    assert_eq!(
        names(&sigs),
        ["calculateTotal", "formatPrice", "calculate_total", "send_email"]
    );
}

#[test]
fn test_fixture_kinds() {
    let registry = default_registry();
    assert_eq!(registry.source_kind("web/cart.js"), Some(SourceKind::Code));
    assert_eq!(registry.source_kind("web/docs/API.md"), Some(SourceKind::Docs));
    assert_eq!(registry.source_kind("api/openapi.json"), Some(SourceKind::Docs));
}
