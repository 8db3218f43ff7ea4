//! Integration tests for model2code-core

use model2code_core::{Document, XmlError, query};
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn test_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("skill.scxml");

    let mut doc = Document::parse(r#"<scxml name="A"><state id="s"/></scxml>"#).unwrap();
    let state = query::find_first_by_tag(&doc, doc.root(), "state").unwrap();
    let transition = doc.create_element("transition", [("event", "CMD_TICK"), ("target", "s")]);
    doc.append_child(state, transition).unwrap();
    doc.write_to_file(&path).unwrap();

    let reloaded = Document::from_file(&path).unwrap();
    let found = query::find_first_by_tag_and_attribute(
        &reloaded,
        reloaded.root(),
        "transition",
        "event",
        "CMD_TICK",
    )
    .unwrap();
    assert_eq!(reloaded.attribute(found, "target"), Some("s"));
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.scxml");

    let err = Document::from_file(&path).unwrap_err();
    assert!(matches!(err, XmlError::File { .. }));
    assert!(err.to_string().contains("absent.scxml"));
}

proptest! {
    /// Attribute values with markup characters survive serialization
    #[test]
    fn prop_attribute_values_survive_serialization(value in "[ -~]{0,40}") {
        let mut doc = Document::parse("<root/>").unwrap();
        let root = doc.root();
        doc.set_attribute(root, "cond", value.clone()).unwrap();

        let text = doc.to_xml_string().unwrap();
        let reparsed = Document::parse(&text).unwrap();
        prop_assert_eq!(reparsed.attribute(reparsed.root(), "cond"), Some(value.as_str()));
    }
}
