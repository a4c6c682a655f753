//! Parsing UML-dialect metamodel documents (DMN-shaped fixtures).

use cmof::{Dialect, Model, ParseOptions, parse};

const DMN_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xmi:XMI xmi:version="20131001" xmlns:xmi="http://www.omg.org/spec/XMI/20131001" xmlns:uml="http://www.omg.org/spec/UML/20131001">
  <uml:Package xmi:id="_dmn" name="DMN12" URI="http://www.omg.org/spec/DMN/20180521/DMN12.xmi">
    <packagedElement xmi:type="uml:Class" xmi:id="NamedElement" name="NamedElement" isAbstract="true"/>
    <packagedElement xmi:type="uml:Class" xmi:id="Definitions" name="Definitions"/>
    <packagedElement xmi:type="uml:Class" xmi:id="DRGElement" name="DRGElement" isAbstract="true">
      <generalization xmi:type="uml:Generalization" xmi:id="DRGElement-gen" general="NamedElement"/>
      <ownedAttribute xmi:id="DRGElement-definitions" name="definitions" visibility="private" type="Definitions" association="A_definitions"/>
    </packagedElement>
  </uml:Package>
  <uml:Tag xmi:id="_tag0" name="org.omg.xmi.nsPrefix" value="dmn" element="_dmn"/>
  <uml:Tag xmi:id="_tag1" name="org.omg.xmi.nsURI" value="http://www.omg.org/spec/DMN/20180521/DMN12.xmi" element="_dmn"/>
</xmi:XMI>
"#;

fn parse_clean(source: &str) -> Model {
    parse(source, ParseOptions::default().with_clean(true)).expect("parse")
}

#[test]
fn uml_dialect_is_detected_from_the_root_namespaces() {
    let model = parse_clean(DMN_FIXTURE);
    assert_eq!(model.dialect(), Some(Dialect::Uml));
    assert!(model.elements_of_kind("uml:Package").next().is_some());
    assert!(model.elements_of_kind("cmof:Package").next().is_none());
}

#[test]
fn metadata_tags_override_package_prefix_and_uri() {
    let model = parse_clean(DMN_FIXTURE);

    let package = model
        .elements_of_kind("uml:Package")
        .next()
        .expect("package");
    // Without the tags the prefix would be the lower-cased name
    // ("dmn12"); the nsPrefix tag wins.
    assert_eq!(package.prefix.as_deref(), Some("dmn"));
    assert_eq!(
        package.uri.as_deref(),
        Some("http://www.omg.org/spec/DMN/20180521/DMN12")
    );
}

#[test]
fn packaged_elements_behave_like_owned_members() {
    let model = parse_clean(DMN_FIXTURE);

    let package = model
        .elements_of_kind("uml:Package")
        .next()
        .expect("package");
    let types: Vec<_> = model
        .children(&package.types)
        .map(|e| e.name().unwrap())
        .collect();
    assert_eq!(types, ["NamedElement", "Definitions", "DRGElement"]);
}

#[test]
fn drg_element_resolves_inheritance_and_references() {
    let model = parse_clean(DMN_FIXTURE);

    let drg_element = model.element_by_id("DRGElement").expect("DRGElement");
    assert!(drg_element.is_abstract);
    assert_eq!(drg_element.super_class, ["NamedElement"]);

    let definitions = model
        .children(&drg_element.properties)
        .next()
        .expect("property");
    assert_eq!(definitions.name(), Some("definitions"));
    assert!(definitions.is_attr);
    assert!(definitions.is_reference);
    assert_eq!(definitions.type_ref.as_deref(), Some("Definitions"));
}
