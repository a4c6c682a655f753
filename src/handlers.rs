//! Tag dispatch and per-tag parse handlers.
//!
//! Dispatch is a two-level lookup: the root envelope `xmi:XMI` always
//! resolves and classifies the metamodel dialect from its declared
//! namespaces; every other tag name is looked up relative to the active
//! dialect prefix. A non-root tag arriving before the dialect is known is
//! a fatal configuration error.

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::builder::{XMI_TYPE, build_element};
use crate::error::ParseError;
use crate::model::{AttrValue, Dialect, Element, ElementKind, NodeId};
use crate::namespace::resolve_qualified;
use crate::parser::{OpenTag, ParseContext};

/// What a handler produced: a new addressable node, or a side-effect-only
/// placeholder. Both occupy a stack frame so close events stay balanced;
/// only element frames are visible as parents.
pub(crate) enum Outcome {
    Element(NodeId),
    Transparent,
}

pub(crate) type Handler =
    fn(&OpenTag, Option<NodeId>, &mut ParseContext) -> Result<Outcome, ParseError>;

/// Whether a tag participates in parsing at all. Close events use this to
/// keep the frame stack balanced with handled opens.
pub(crate) fn can_parse(name: &str, ctx: &ParseContext) -> Result<bool, ParseError> {
    Ok(handler_for(name, ctx)?.is_some())
}

/// Registry lookup for a tag's effective name.
pub(crate) fn handler_for(name: &str, ctx: &ParseContext) -> Result<Option<Handler>, ParseError> {
    if name == "xmi:XMI" {
        return Ok(Some(on_xmi));
    }

    let dialect = ctx.dialect.ok_or(ParseError::MissingNamespacePrefix)?;

    if let Some(local) = name
        .strip_prefix(dialect.prefix())
        .and_then(|rest| rest.strip_prefix(':'))
    {
        match local {
            "Tag" => return Ok(Some(on_tag)),
            "Package" => return Ok(Some(on_package)),
            _ => {}
        }
    }

    Ok(match name {
        "defaultValue" => Some(on_default_value),
        "generalization" => Some(on_generalization),
        "ownedAttribute" => Some(on_owned_attribute),
        "ownedEnd" => Some(on_owned_end),
        "ownedLiteral" => Some(on_owned_literal),
        "ownedMember" | "packagedElement" => Some(on_owned_member),
        "redefinedProperty" => Some(on_redefined_property),
        "superClass" => Some(on_super_class),
        "type" => Some(on_type),
        "upperValue" => Some(on_upper_value),
        _ => None,
    })
}

// ============================================================================
// REGISTRATION & SHARED HELPERS
// ============================================================================

/// Arena-allocate and index an element: by id when one is present and
/// non-empty, and by its qualified kind string when known.
fn register(element: Element, kind: Option<SmolStr>, ctx: &mut ParseContext) -> NodeId {
    let id = element.id.clone();
    let node = ctx.model.alloc(element);
    match id {
        Some(id) if !id.is_empty() => ctx.model.register_id(id, node),
        _ => warn!("element registered without an id"),
    }
    if let Some(kind) = kind {
        ctx.model.register_kind(kind, node);
    }
    node
}

/// Which parent collection an owned member lands in, keyed by its
/// dialect-qualified kind. Unknown kinds land nowhere.
fn collection_for(xmi_type: &str, dialect: Dialect) -> Option<Collection> {
    let local = xmi_type
        .strip_prefix(dialect.prefix())?
        .strip_prefix(':')?;
    match ElementKind::from_local(local) {
        ElementKind::Association => Some(Collection::Associations),
        ElementKind::Class
        | ElementKind::DataType
        | ElementKind::PrimitiveType
        | ElementKind::Type => Some(Collection::Types),
        ElementKind::Enumeration => Some(Collection::Enumerations),
        _ => None,
    }
}

enum Collection {
    Types,
    Associations,
    Enumerations,
}

const PRIMITIVE_TYPES: [&str; 5] = ["Boolean", "Element", "Integer", "Real", "String"];

/// Resolve an href to a known primitive-type name, if it points at one.
fn primitive_type(href: &str) -> Option<&str> {
    let name = href.rsplit('#').next().unwrap_or(href);
    PRIMITIVE_TYPES.contains(&name).then_some(name)
}

/// Strip the trailing `-XMI` suffix or the first `.xmi` occurrence from a
/// namespace uri.
fn strip_xmi_suffix(uri: &str) -> SmolStr {
    if let Some(pos) = uri.find(".xmi") {
        let mut stripped = String::with_capacity(uri.len() - 4);
        stripped.push_str(&uri[..pos]);
        stripped.push_str(&uri[pos + 4..]);
        SmolStr::new(stripped)
    } else if let Some(stripped) = uri.strip_suffix("-XMI") {
        SmolStr::new(stripped)
    } else {
        SmolStr::new(uri)
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Root envelope: classify the metamodel dialect from the declared
/// namespaces. Must run before any prefix-relative tag is dispatched.
fn on_xmi(
    tag: &OpenTag,
    _parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    for (key, _) in tag.attributes() {
        if let Some(declared) = key.strip_prefix("xmlns:") {
            if declared.ends_with("cmof") {
                ctx.dialect = Some(Dialect::Cmof);
            } else if declared.ends_with("uml") {
                ctx.dialect = Some(Dialect::Uml);
            }
        }
    }
    debug!(dialect = ?ctx.dialect, "resolved metamodel dialect");
    Ok(Outcome::Transparent)
}

/// `cmof:Package` / `uml:Package`: registers the package and derives its
/// namespace `prefix` and `uri`.
fn on_package(
    tag: &OpenTag,
    _parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let mut element = build_element(tag, ElementKind::Package, ctx);

    // Both may be overridden by an org.omg.xmi.nsPrefix / nsURI metadata
    // tag later in the document.
    let name = tag
        .attr("name")
        .ok_or_else(|| ParseError::missing_attribute(tag.name(), "name"))?;
    element.prefix = Some(SmolStr::new(name.to_lowercase()));

    let uri = tag
        .attr("uri")
        .or_else(|| tag.attr("URI"))
        .ok_or_else(|| ParseError::missing_attribute(tag.name(), "uri"))?;
    element.uri = Some(strip_xmi_suffix(uri));

    let kind = tag
        .attr(XMI_TYPE)
        .map(SmolStr::new)
        .unwrap_or_else(|| SmolStr::new(tag.name()));
    let node = register(element, Some(kind), ctx);

    if ctx.options.clean {
        let element = ctx.model.get_mut(node);
        element.id = None;
        element.attrs.shift_remove("URI");
    }

    Ok(Outcome::Element(node))
}

/// `ownedMember` / `packagedElement`: classes, data types, associations,
/// and enumerations. Registers the element, normalizes its `superClass`
/// attribute, and files it into the parent's kind-specific collection.
fn on_owned_member(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let kind_attr = tag.attr(XMI_TYPE).map(SmolStr::new);
    let kind = kind_attr
        .as_deref()
        .map(ElementKind::from_xmi_type)
        .unwrap_or(ElementKind::Other);
    let mut element = build_element(tag, kind, ctx);

    // Normalize superClass="Foo Bar" into ["Foo", "Bar"].
    if let Some(AttrValue::Str(raw)) = element.attrs.shift_remove("superClass") {
        element.super_class = raw
            .split_whitespace()
            .map(|name| resolve_qualified(name, ctx.prefix_namespaces()))
            .collect();
    }

    let node = register(element, kind_attr.clone(), ctx);
    // The id only matters for the index; the record itself drops it.
    ctx.model.get_mut(node).id = None;

    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let dialect = ctx.dialect.ok_or(ParseError::MissingNamespacePrefix)?;
    if let Some(collection) = kind_attr.as_deref().and_then(|k| collection_for(k, dialect)) {
        let parent = ctx.model.get_mut(parent);
        match collection {
            Collection::Types => parent.types.push(node),
            Collection::Associations => parent.associations.push(node),
            Collection::Enumerations => parent.enumerations.push(node),
        }
    }

    Ok(Outcome::Element(node))
}

/// `ownedAttribute`: a property or association end; computes the derived
/// cardinality flags.
fn on_owned_attribute(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let mut element = build_element(tag, ElementKind::Property, ctx);

    let is_composite = element.is_composite || element.aggregation.as_deref() == Some("composite");

    // Many-valued unless the lower bound is absent-or-zero and the upper
    // bound is absent.
    let lower = element.lower.as_deref();
    let is_many = !(element.upper.is_none() && (lower.is_none() || lower == Some("0")));
    if is_many {
        element.is_many = true;
    }

    let is_virtual = element.is_derived || element.is_derived_union;
    if is_virtual {
        element.is_virtual = true;
    }

    // A plain attribute, unless a later type/upperValue child revokes it.
    if !is_composite && !is_many && !is_virtual {
        element.is_attr = true;
    }

    if element.association.is_some() && !is_composite {
        element.is_reference = true;
    }

    if ctx.options.clean {
        clean_property(&mut element);
    }

    let node = ctx.model.alloc(element);
    ctx.model.get_mut(parent).properties.push(node);
    Ok(Outcome::Element(node))
}

fn clean_property(element: &mut Element) {
    element.aggregation = None;
    element.association = None;
    element.id = None;
    element.is_composite = false;
    element.is_derived = false;
    element.is_derived_union = false;
    element.is_ordered = false;
    element.lower = None;
    element.upper = None;
    element.visibility = None;
    element.attrs.shift_remove("datatype");
}

/// `ownedLiteral`: an enumeration value; registered and appended to the
/// parent's literal list.
fn on_owned_literal(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let mut element = build_element(tag, ElementKind::EnumerationLiteral, ctx);

    if ctx.options.clean {
        element.attrs.shift_remove("classifier");
        element.attrs.shift_remove("enumeration");
    }

    let node = register(element, tag.attr(XMI_TYPE).map(SmolStr::new), ctx);
    if ctx.options.clean {
        ctx.model.get_mut(node).id = None;
    }
    ctx.model.get_mut(parent).literal_values.push(node);
    Ok(Outcome::Element(node))
}

/// `ownedEnd`: an association's owned end, recorded on the parent only.
fn on_owned_end(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let element = build_element(tag, ElementKind::Property, ctx);
    let node = ctx.model.alloc(element);
    ctx.model.get_mut(parent).owned_end = Some(node);
    Ok(Outcome::Element(node))
}

/// `generalization`: registers the edge and appends its `general`
/// reference onto the parent's superclass list.
fn on_generalization(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let element = build_element(tag, ElementKind::Generalization, ctx);

    let general = match element.attr("general") {
        Some(AttrValue::Str(general)) => general.clone(),
        _ => return Err(ParseError::missing_attribute(tag.name(), "general")),
    };

    let node = register(element, tag.attr(XMI_TYPE).map(SmolStr::new), ctx);
    ctx.model.get_mut(parent).super_class.push(general);
    Ok(Outcome::Element(node))
}

/// `superClass` (href form): a primitive-type name when recognized, the
/// href verbatim otherwise.
fn on_super_class(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let href = tag
        .attr("href")
        .ok_or_else(|| ParseError::missing_attribute(tag.name(), "href"))?;

    let name = primitive_type(href).unwrap_or(href);
    let resolved = resolve_qualified(name, ctx.prefix_namespaces());
    ctx.model.get_mut(parent).super_class.push(resolved);
    Ok(Outcome::Transparent)
}

/// `type` (href form): sets the parent's type. A complex non-reference
/// type cannot stay rendered as an attribute.
fn on_type(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let href = tag
        .attr("href")
        .ok_or_else(|| ParseError::missing_attribute(tag.name(), "href"))?;

    let primitive = primitive_type(href);
    let resolved = resolve_qualified(primitive.unwrap_or(href), ctx.prefix_namespaces());

    let parent = ctx.model.get_mut(parent);
    parent.type_ref = Some(resolved);
    if parent.is_attr && !parent.is_reference && primitive.is_none() {
        parent.is_attr = false;
    }
    Ok(Outcome::Transparent)
}

/// `defaultValue`: copies the nested instance-or-literal value onto the
/// parent.
fn on_default_value(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let element = build_element(tag, ElementKind::Value, ctx);

    let default = element
        .attr("instance")
        .or_else(|| element.attr("value"))
        .cloned();

    let node = ctx.model.alloc(element);
    ctx.model.get_mut(parent).default = default;
    Ok(Outcome::Element(node))
}

/// `upperValue`: the `*` wildcard makes the parent many-valued and
/// revokes any attribute marking.
fn on_upper_value(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let element = build_element(tag, ElementKind::Value, ctx);
    let node = ctx.model.alloc(element);

    if tag.attr("value") == Some("*") {
        let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
        let parent = ctx.model.get_mut(parent);
        parent.is_many = true;
        parent.is_attr = false;
    }
    Ok(Outcome::Element(node))
}

/// `redefinedProperty` (href form): records an `Owner#member`
/// cross-reference on the parent; introduces no addressable node.
fn on_redefined_property(
    tag: &OpenTag,
    parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let parent = parent.ok_or_else(|| ParseError::missing_parent(tag.name()))?;
    let href = tag
        .attr("href")
        .ok_or_else(|| ParseError::missing_attribute(tag.name(), "href"))?;

    let resolved = resolve_qualified(href, ctx.prefix_namespaces());
    let redefines = SmolStr::new(resolved.replacen('-', "#", 1));
    ctx.model.get_mut(parent).redefines = Some(redefines);
    Ok(Outcome::Transparent)
}

/// `cmof:Tag` / `uml:Tag`: name/value metadata attached to a previously
/// registered element; carries namespace prefix and uri overrides.
fn on_tag(
    tag: &OpenTag,
    _parent: Option<NodeId>,
    ctx: &mut ParseContext,
) -> Result<Outcome, ParseError> {
    let element = build_element(tag, ElementKind::Tag, ctx);

    let referenced = match element.attr("element") {
        Some(AttrValue::Str(referenced)) => referenced.clone(),
        _ => return Err(ParseError::missing_attribute(tag.name(), "element")),
    };
    let target = ctx
        .model
        .node_by_id(&referenced)
        .ok_or_else(|| ParseError::UnresolvedTagReference(referenced.to_string()))?;

    let name = element.name.clone();
    let value = match element.attr("value") {
        Some(AttrValue::Str(value)) => Some(value.clone()),
        _ => None,
    };
    let node = ctx.model.alloc(element);

    if let (Some(name), Some(value)) = (name, value) {
        let target = ctx.model.get_mut(target);
        match name.as_str() {
            "org.omg.xmi.nsPrefix" => target.prefix = Some(value),
            "org.omg.xmi.nsURI" => target.uri = Some(strip_xmi_suffix(&value)),
            _ => {}
        }
    }
    Ok(Outcome::Element(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn cmof_ctx() -> ParseContext {
        let mut ctx = ParseContext::for_tests(ParseOptions::default());
        ctx.dialect = Some(Dialect::Cmof);
        ctx
    }

    #[test]
    fn root_envelope_always_resolves() {
        let ctx = ParseContext::for_tests(ParseOptions::default());
        assert!(handler_for("xmi:XMI", &ctx).unwrap().is_some());
    }

    #[test]
    fn non_root_lookup_before_dialect_fails() {
        let ctx = ParseContext::for_tests(ParseOptions::default());
        assert!(matches!(
            handler_for("ownedMember", &ctx),
            Err(ParseError::MissingNamespacePrefix)
        ));
    }

    #[test]
    fn dispatch_is_prefix_relative() {
        let ctx = cmof_ctx();
        assert!(can_parse("cmof:Package", &ctx).unwrap());
        assert!(can_parse("cmof:Tag", &ctx).unwrap());
        assert!(!can_parse("uml:Package", &ctx).unwrap());
        assert!(!can_parse("ownedComment", &ctx).unwrap());
        assert!(can_parse("packagedElement", &ctx).unwrap());
    }

    #[test]
    fn collections_are_dialect_qualified() {
        assert!(matches!(
            collection_for("cmof:Association", Dialect::Cmof),
            Some(Collection::Associations)
        ));
        assert!(matches!(
            collection_for("cmof:PrimitiveType", Dialect::Cmof),
            Some(Collection::Types)
        ));
        assert!(matches!(
            collection_for("uml:Enumeration", Dialect::Uml),
            Some(Collection::Enumerations)
        ));
        assert!(collection_for("uml:Class", Dialect::Cmof).is_none());
        assert!(collection_for("cmof:Generalization", Dialect::Cmof).is_none());
    }

    #[test]
    fn primitive_hrefs_resolve_to_bare_names() {
        assert_eq!(
            primitive_type("http://schema.omg.org/spec/MOF/2.0/cmof.xml#Boolean"),
            Some("Boolean")
        );
        assert_eq!(primitive_type("String"), Some("String"));
        assert_eq!(primitive_type("DC.cmof#Bounds"), None);
    }

    #[test]
    fn uri_decoration_is_stripped() {
        assert_eq!(
            strip_xmi_suffix("http://www.omg.org/spec/BPMN/20100524/MODEL-XMI"),
            "http://www.omg.org/spec/BPMN/20100524/MODEL"
        );
        assert_eq!(
            strip_xmi_suffix("http://www.omg.org/spec/DMN/20180521/DMN12.xmi"),
            "http://www.omg.org/spec/DMN/20180521/DMN12"
        );
        assert_eq!(strip_xmi_suffix("urn:plain"), "urn:plain");
    }
}
