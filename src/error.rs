//! Error types for XMI metamodel parsing.

use thiserror::Error;

/// Errors that can occur while parsing an XMI metamodel document.
///
/// Every variant is fatal: the parse aborts and no partial model is
/// returned. Forward references that never resolve are NOT errors; the
/// resolution pass leaves them unchanged and treats them as external or
/// primitive names.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed markup reported by the underlying XML tokenizer.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The root element's namespace declarations matched neither the CMOF
    /// nor the UML dialect, so prefix-relative tags cannot be dispatched.
    #[error("namespace prefix not found")]
    MissingNamespacePrefix,

    /// A tag was classified as parseable but no handler was registered
    /// for it. Indicates a dispatcher invariant violation, not a bad
    /// document.
    #[error("no parser for tag <{0}>")]
    UnknownTagHandler(String),

    /// A handler that structurally requires an enclosing element was
    /// invoked without one.
    #[error("<{tag}> requires a parent element")]
    MissingParent { tag: String },

    /// A mandatory attribute was absent.
    #[error("missing attribute `{name}` on <{tag}>")]
    MissingAttribute { tag: String, name: &'static str },

    /// A metadata tag referenced an element id that was never registered.
    #[error("referenced element <{0}> not found")]
    UnresolvedTagReference(String),
}

impl ParseError {
    /// Create a malformed-document error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// Create a missing-parent error.
    pub fn missing_parent(tag: impl Into<String>) -> Self {
        Self::MissingParent { tag: tag.into() }
    }

    /// Create a missing-attribute error.
    pub fn missing_attribute(tag: impl Into<String>, name: &'static str) -> Self {
        Self::MissingAttribute {
            tag: tag.into(),
            name,
        }
    }
}
