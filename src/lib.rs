//! # cmof-base
//!
//! Core library for MOF/UML XMI metamodel parsing and model indexing.
//!
//! Parses the OMG XMI metamodel documents that define BPMN, DMN, and
//! related modeling languages into an in-memory, queryable model: an
//! identifier index and a kind index over typed elements. Downstream
//! schema/code generators consume the model to produce language
//! bindings.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! parser    → quick-xml event drive, frame stack, ParseContext
//!   ↓
//! handlers  → dialect detection, tag dispatch table, per-tag handlers
//!   ↓
//! builder   → open-tag events → element attribute records
//!   ↓
//! namespace → qualified-name canonicalization
//!   ↓
//! resolve   → post-stream reference resolution
//!   ↓
//! model     → element arena, identifier/kind indices
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use cmof::{ParseOptions, parse};
//!
//! let source = std::fs::read_to_string("BPMN20.cmof")?;
//! let model = parse(&source, ParseOptions::default().with_clean(true))?;
//!
//! let package = model.elements_of_kind("cmof:Package").next().unwrap();
//! let sub_process = model.element_by_id("SubProcess").unwrap();
//! ```

mod builder;
pub mod error;
mod handlers;
pub mod model;
mod namespace;
pub mod options;
mod parser;
mod resolve;

pub use error::ParseError;
pub use model::{AttrValue, Dialect, Element, ElementKind, Model, NodeId};
pub use options::ParseOptions;

/// Parse a MOF/UML XMI document into a [`Model`].
///
/// Drives the streaming tag dispatch over the document in a single
/// forward pass, then resolves cross-references (inheritance chains,
/// property types, default values) once every element has been
/// registered. All state is created fresh per invocation; concurrent
/// calls share nothing.
pub fn parse(input: &str, options: ParseOptions) -> Result<Model, ParseError> {
    parser::XmiParser::new(options).parse(input)
}
