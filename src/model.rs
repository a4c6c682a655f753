//! In-memory model produced by one parse.
//!
//! The model is an arena of [`Element`] nodes plus two indices over it:
//! identifier → element and qualified kind → elements. Child lists
//! (`properties`, `types`, `literal_values`, …) store [`NodeId`]s rather
//! than owned elements, so an element appearing both in an index and in a
//! parent's collection is a single node: a rewrite during the resolution
//! pass is visible through every list that contains it.
//!
//! ```text
//! Model
//! ├── nodes: Vec<Element>                     (arena)
//! ├── by_id: IndexMap<SmolStr, NodeId>       (insertion order preserved)
//! └── by_kind: IndexMap<SmolStr, Vec<NodeId>>
//! ```

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::Serialize;

// ============================================================================
// NODE IDS
// ============================================================================

/// Index of an element in the model's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// DIALECT
// ============================================================================

/// Metamodel dialect, resolved once from the root element's `xmlns:`
/// declarations. Every prefix-relative tag and kind lookup depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Dialect {
    Cmof,
    Uml,
}

impl Dialect {
    /// The namespace prefix qualifying dialect-scoped tag and kind names.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Cmof => "cmof",
            Self::Uml => "uml",
        }
    }
}

// ============================================================================
// ATTRIBUTE VALUES
// ============================================================================

/// An attribute value after boolean coercion.
///
/// The literal strings `"true"`/`"false"` become [`AttrValue::Bool`];
/// everything else stays a string (canonicalized through the caller's
/// prefix table).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum AttrValue {
    Bool(bool),
    Str(SmolStr),
}

impl AttrValue {
    /// Get the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Bool(_) => None,
        }
    }

    /// Get the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(SmolStr::new(s))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// The metatype of a parsed element.
///
/// The kind *index* on [`Model`] is keyed by the raw qualified strings
/// found in the document (`"cmof:Class"`, `"uml:Package"`); this enum is
/// the typed view handlers and downstream generators dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ElementKind {
    Package,
    Class,
    DataType,
    PrimitiveType,
    Type,
    Enumeration,
    Association,
    Property,
    EnumerationLiteral,
    Generalization,
    Tag,
    /// Synthetic value holder (`defaultValue`, `upperValue`); never
    /// registered in either index.
    Value,
    Other,
}

impl ElementKind {
    /// Parse from an unqualified metaclass name.
    pub fn from_local(local: &str) -> Self {
        match local {
            "Package" => Self::Package,
            "Class" => Self::Class,
            "DataType" => Self::DataType,
            "PrimitiveType" => Self::PrimitiveType,
            "Type" => Self::Type,
            "Enumeration" => Self::Enumeration,
            "Association" => Self::Association,
            "Property" => Self::Property,
            "EnumerationLiteral" => Self::EnumerationLiteral,
            "Generalization" => Self::Generalization,
            "Tag" => Self::Tag,
            _ => Self::Other,
        }
    }

    /// Parse from a qualified `xmi:type` value, e.g. `"cmof:Class"`.
    pub fn from_xmi_type(xmi_type: &str) -> Self {
        let local = xmi_type.rsplit(':').next().unwrap_or(xmi_type);
        Self::from_local(local)
    }

    /// Returns true for type-like kinds that class hierarchies are built
    /// from.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::DataType | Self::PrimitiveType | Self::Type | Self::Enumeration
        )
    }
}

// ============================================================================
// ELEMENT
// ============================================================================

/// One parsed construct: a package, class, property, enumeration literal,
/// generalization edge, and so on.
///
/// All kinds share the id/name substructure; the kind-specific fields are
/// left at their defaults when a handler does not populate them.
/// Attributes the parser does not interpret keep their document-order
/// slot in [`attrs`](Self::attrs).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Element {
    /// Persistent identifier (`xmi:id`). Cleared on some kinds after
    /// registration; the index key survives.
    pub id: Option<SmolStr>,
    /// The metatype.
    pub kind: ElementKind,
    /// Declared name (absent on some kinds).
    pub name: Option<SmolStr>,

    /// Superclass references: identifiers during parsing, rewritten to
    /// names by the resolution pass where they resolve.
    pub super_class: Vec<SmolStr>,
    /// Owned attributes, in document order.
    pub properties: Vec<NodeId>,
    /// Enumeration literals, in document order.
    pub literal_values: Vec<NodeId>,
    /// Contained classes, data types, and primitive types.
    pub types: Vec<NodeId>,
    /// Contained associations.
    pub associations: Vec<NodeId>,
    /// Contained enumerations.
    pub enumerations: Vec<NodeId>,
    /// An association's owned end.
    pub owned_end: Option<NodeId>,

    /// Namespace prefix (packages; may be overridden by a metadata tag).
    pub prefix: Option<SmolStr>,
    /// Namespace uri, stripped of its `-XMI`/`.xmi` decoration.
    pub uri: Option<SmolStr>,

    /// Referenced type: an identifier during parsing, a name after
    /// resolution.
    pub type_ref: Option<SmolStr>,
    /// Default value, from a `default` attribute or a nested
    /// `defaultValue` element.
    pub default: Option<AttrValue>,
    /// Redefined property cross-reference (`Owner#member`).
    pub redefines: Option<SmolStr>,

    // Cardinality inputs, as declared in the document.
    pub lower: Option<SmolStr>,
    pub upper: Option<SmolStr>,
    pub aggregation: Option<SmolStr>,
    pub association: Option<SmolStr>,
    pub visibility: Option<SmolStr>,
    pub is_composite: bool,
    pub is_derived: bool,
    pub is_derived_union: bool,
    pub is_ordered: bool,

    // Derived flags.
    pub is_abstract: bool,
    pub is_attr: bool,
    pub is_id: bool,
    pub is_many: bool,
    pub is_virtual: bool,
    pub is_reference: bool,

    /// Remaining uninterpreted attributes, in document order.
    pub attrs: IndexMap<SmolStr, AttrValue>,
}

impl Element {
    /// Create an empty element of the given kind.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: None,
            kind,
            name: None,
            super_class: Vec::new(),
            properties: Vec::new(),
            literal_values: Vec::new(),
            types: Vec::new(),
            associations: Vec::new(),
            enumerations: Vec::new(),
            owned_end: None,
            prefix: None,
            uri: None,
            type_ref: None,
            default: None,
            redefines: None,
            lower: None,
            upper: None,
            aggregation: None,
            association: None,
            visibility: None,
            is_composite: false,
            is_derived: false,
            is_derived_union: false,
            is_ordered: false,
            is_abstract: false,
            is_attr: false,
            is_id: false,
            is_many: false,
            is_virtual: false,
            is_reference: false,
            attrs: IndexMap::new(),
        }
    }

    /// Get an uninterpreted attribute by key.
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Get the name as a string slice.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// The queryable model returned by a parse: an element arena plus the
/// identifier and kind indices.
///
/// Both indices iterate in insertion (document) order, so walking the
/// model is deterministic within one run.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Model {
    pub(crate) nodes: Vec<Element>,
    pub(crate) by_id: IndexMap<SmolStr, NodeId>,
    pub(crate) by_kind: IndexMap<SmolStr, Vec<NodeId>>,
    pub(crate) dialect: Option<Dialect>,
}

impl Model {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate an element in the arena without indexing it.
    pub(crate) fn alloc(&mut self, element: Element) -> NodeId {
        let node = NodeId(self.nodes.len() as u32);
        self.nodes.push(element);
        node
    }

    /// Index a node under its identifier. Duplicates are logged; the
    /// later element wins.
    pub(crate) fn register_id(&mut self, id: SmolStr, node: NodeId) {
        if self.by_id.insert(id.clone(), node).is_some() {
            warn!(%id, "duplicate element id, later element wins");
        }
    }

    /// Append a node to the list for its qualified kind.
    pub(crate) fn register_kind(&mut self, kind: SmolStr, node: NodeId) {
        self.by_kind.entry(kind).or_default().push(node);
    }

    pub(crate) fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_id.values().copied()
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.nodes[node.index()]
    }

    /// Get an element by arena id.
    pub fn get(&self, node: NodeId) -> &Element {
        &self.nodes[node.index()]
    }

    /// Look up an element by its document identifier.
    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        self.node_by_id(id).map(|node| self.get(node))
    }

    /// All elements registered under a qualified kind, in document order.
    pub fn elements_of_kind<'a>(&'a self, kind: &str) -> impl Iterator<Item = &'a Element> {
        self.by_kind
            .get(kind)
            .into_iter()
            .flatten()
            .map(|node| self.get(*node))
    }

    /// The qualified kind strings encountered in the document.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(SmolStr::as_str)
    }

    /// Iterate the identifier index in insertion order.
    pub fn iter_by_id(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.by_id
            .iter()
            .map(|(id, node)| (id.as_str(), self.get(*node)))
    }

    /// Resolve a child list into its elements.
    pub fn children<'a>(&'a self, nodes: &'a [NodeId]) -> impl Iterator<Item = &'a Element> {
        nodes.iter().map(|node| self.get(*node))
    }

    /// Number of elements in the identifier index.
    pub fn element_count(&self) -> usize {
        self.by_id.len()
    }

    /// The dialect resolved from the document's root element.
    pub fn dialect(&self) -> Option<Dialect> {
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_from_qualified_type() {
        assert_eq!(ElementKind::from_xmi_type("cmof:Class"), ElementKind::Class);
        assert_eq!(ElementKind::from_xmi_type("uml:Package"), ElementKind::Package);
        assert_eq!(
            ElementKind::from_xmi_type("cmof:PrimitiveType"),
            ElementKind::PrimitiveType
        );
        assert_eq!(ElementKind::from_xmi_type("Enumeration"), ElementKind::Enumeration);
        assert_eq!(ElementKind::from_xmi_type("cmof:Import"), ElementKind::Other);
    }

    #[test]
    fn duplicate_id_keeps_later_element() {
        let mut model = Model::new();

        let mut first = Element::new(ElementKind::Class);
        first.name = Some("First".into());
        let first = model.alloc(first);
        model.register_id("shared".into(), first);

        let mut second = Element::new(ElementKind::Class);
        second.name = Some("Second".into());
        let second = model.alloc(second);
        model.register_id("shared".into(), second);

        assert_eq!(model.element_count(), 1);
        assert_eq!(model.element_by_id("shared").unwrap().name(), Some("Second"));
    }

    #[test]
    fn kind_index_preserves_document_order() {
        let mut model = Model::new();
        for name in ["A", "B", "C"] {
            let mut element = Element::new(ElementKind::Class);
            element.name = Some(name.into());
            let node = model.alloc(element);
            model.register_kind("cmof:Class".into(), node);
        }

        let names: Vec<_> = model
            .elements_of_kind("cmof:Class")
            .map(|e| e.name().unwrap().to_string())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }
}
