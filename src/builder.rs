//! Element construction from open-tag events.

use smol_str::SmolStr;

use crate::model::{AttrValue, Element, ElementKind};
use crate::namespace::resolve_qualified;
use crate::parser::{OpenTag, ParseContext};

/// Reserved identity attribute carrying the element's persistent id.
pub(crate) const XMI_ID: &str = "xmi:id";
/// Reserved identity attribute carrying the element's concrete kind.
pub(crate) const XMI_TYPE: &str = "xmi:type";

/// Build the attribute record for one open tag.
///
/// Attributes carrying the reserved `xmi:` identity prefix are dropped
/// from the visible set (id and kind are consumed separately), the
/// literal strings `"true"`/`"false"` are coerced to booleans, and
/// remaining string values are canonicalized through the caller's prefix
/// table. `id` is always taken from `xmi:id`, whether or not it appeared
/// in the visible set. Never fails.
pub(crate) fn build_element(tag: &OpenTag, kind: ElementKind, ctx: &ParseContext) -> Element {
    let mut element = Element::new(kind);
    for (key, value) in tag.attributes() {
        if key.starts_with("xmi:") {
            continue;
        }
        route(&mut element, key, coerce(value, ctx));
    }
    element.id = tag.attr(XMI_ID).map(SmolStr::new);
    element
}

fn coerce(value: &str, ctx: &ParseContext) -> AttrValue {
    match value {
        "true" => AttrValue::Bool(true),
        "false" => AttrValue::Bool(false),
        other => AttrValue::Str(resolve_qualified(other, ctx.prefix_namespaces())),
    }
}

/// Route a coerced attribute onto the element's typed fields; anything
/// unrecognized keeps its document-order slot in `attrs`.
fn route(element: &mut Element, key: &str, value: AttrValue) {
    match (key, value) {
        ("name", AttrValue::Str(s)) => element.name = Some(s),
        ("prefix", AttrValue::Str(s)) => element.prefix = Some(s),
        ("uri", AttrValue::Str(s)) => element.uri = Some(s),
        ("type", AttrValue::Str(s)) => element.type_ref = Some(s),
        ("default", value) => element.default = Some(value),
        ("lower", AttrValue::Str(s)) => element.lower = Some(s),
        ("upper", AttrValue::Str(s)) => element.upper = Some(s),
        ("aggregation", AttrValue::Str(s)) => element.aggregation = Some(s),
        ("association", AttrValue::Str(s)) => element.association = Some(s),
        ("visibility", AttrValue::Str(s)) => element.visibility = Some(s),
        ("isAbstract", AttrValue::Bool(b)) => element.is_abstract = b,
        ("isComposite", AttrValue::Bool(b)) => element.is_composite = b,
        ("isDerived", AttrValue::Bool(b)) => element.is_derived = b,
        ("isDerivedUnion", AttrValue::Bool(b)) => element.is_derived_union = b,
        ("isOrdered", AttrValue::Bool(b)) => element.is_ordered = b,
        (key, value) => {
            element.attrs.insert(SmolStr::new(key), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn tag(attributes: &[(&str, &str)]) -> OpenTag {
        OpenTag::new(
            "ownedAttribute",
            attributes
                .iter()
                .map(|(k, v)| (SmolStr::new(k), SmolStr::new(v)))
                .collect(),
        )
    }

    #[test]
    fn reserved_identity_attributes_are_dropped() {
        let ctx = ParseContext::for_tests(ParseOptions::default());
        let element = build_element(
            &tag(&[("xmi:id", "P-1"), ("xmi:type", "cmof:Property"), ("name", "body")]),
            ElementKind::Property,
            &ctx,
        );

        assert_eq!(element.id.as_deref(), Some("P-1"));
        assert_eq!(element.name(), Some("body"));
        assert!(element.attr("xmi:type").is_none());
    }

    #[test]
    fn boolean_literals_are_coerced() {
        let ctx = ParseContext::for_tests(ParseOptions::default());
        let element = build_element(
            &tag(&[("isAbstract", "true"), ("default", "false"), ("upper", "2")]),
            ElementKind::Property,
            &ctx,
        );

        assert!(element.is_abstract);
        assert_eq!(element.default, Some(AttrValue::Bool(false)));
        assert_eq!(element.upper.as_deref(), Some("2"));
    }

    #[test]
    fn string_values_pass_through_the_prefix_table() {
        let options = ParseOptions::default().with_prefix_namespaces([("DC.cmof", "dc")]);
        let ctx = ParseContext::for_tests(options);
        let element = build_element(
            &tag(&[("type", "DC.cmof#Bounds"), ("datatype", "DC.cmof#Font")]),
            ElementKind::Property,
            &ctx,
        );

        assert_eq!(element.type_ref.as_deref(), Some("dc:Bounds"));
        assert_eq!(element.attr("datatype"), Some(&AttrValue::from("dc:Font")));
    }

    #[test]
    fn id_is_set_even_without_visible_attributes() {
        let ctx = ParseContext::for_tests(ParseOptions::default());
        let element = build_element(&tag(&[]), ElementKind::Property, &ctx);
        assert!(element.id.is_none());
        assert!(element.attrs.is_empty());
    }
}
