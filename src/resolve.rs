//! Post-stream resolution of forward references.
//!
//! During the drive, handlers record cross-references as raw
//! identifiers; only once the whole document has streamed in is every
//! identifier guaranteed to be registered. This pass is the single place
//! where by-id dereferencing happens: one flat walk over the identifier
//! index, no recursion.

use smol_str::SmolStr;
use tracing::debug;

use crate::model::{AttrValue, Model, NodeId};

/// Wrapper primitives that downstream bindings render as plain strings.
const STRING_WRAPPERS: [&str; 3] = ["URI", "QName", "ID"];

impl Model {
    /// Rewrite forward references now that every element is registered:
    /// property types and defaults, identifier marking, and superclass
    /// lists. Identifiers that do not resolve are left unchanged; they
    /// name external or primitive types.
    ///
    /// Runs once at end-of-stream; running it again produces no further
    /// change.
    pub fn resolve_references(&mut self) {
        let registered: Vec<NodeId> = self.node_ids().collect();
        for node in registered.iter().copied() {
            let properties = self.get(node).properties.clone();
            for property in properties {
                self.resolve_property(property);
            }
            self.resolve_super_classes(node);
        }
        debug!(elements = registered.len(), "resolved cross-references");
    }

    fn resolve_property(&mut self, property: NodeId) {
        let resolved = self
            .get(property)
            .type_ref
            .as_deref()
            .and_then(|type_ref| self.node_by_id(type_ref))
            .and_then(|target| self.get(target).name.clone());

        match resolved {
            Some(name) => {
                let property = self.get_mut(property);
                if name == "ID" {
                    property.is_attr = true;
                    property.is_id = true;
                }
                property.type_ref = Some(if STRING_WRAPPERS.contains(&name.as_str()) {
                    SmolStr::new_static("String")
                } else {
                    name
                });
            }
            None => {
                // An unresolved type on a property named `id` still marks
                // the reserved identifier attribute.
                let property = self.get_mut(property);
                if property.name.as_deref() == Some("id") {
                    property.is_attr = true;
                    property.is_id = true;
                }
            }
        }

        let default = match &self.get(property).default {
            Some(AttrValue::Str(default)) => self
                .node_by_id(default)
                .and_then(|target| self.get(target).name.clone()),
            _ => None,
        };
        if let Some(name) = default {
            self.get_mut(property).default = Some(AttrValue::Str(name));
        }
    }

    fn resolve_super_classes(&mut self, node: NodeId) {
        if self.get(node).super_class.is_empty() {
            return;
        }
        let resolved: Vec<SmolStr> = self
            .get(node)
            .super_class
            .iter()
            .map(|entry| {
                self.node_by_id(entry)
                    .and_then(|target| self.get(target).name.clone())
                    .unwrap_or_else(|| entry.clone())
            })
            .collect();
        self.get_mut(node).super_class = resolved;
    }
}
