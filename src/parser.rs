//! Streaming drive over the tokenizer's event stream.
//!
//! The driver owns the frame stack that mirrors document nesting: every
//! handled open tag pushes one frame, every handled close tag pops one.
//! Unrecognized tags are skipped transparently (their attributes with
//! them), but their children are still evaluated individually. When the
//! stream ends, the resolution pass runs exactly once over the registered
//! elements.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::error::ParseError;
use crate::handlers::{self, Outcome};
use crate::model::{Dialect, Model, NodeId};
use crate::options::ParseOptions;

/// One open-tag event: the raw tag name plus its attributes in document
/// order.
pub(crate) struct OpenTag {
    name: SmolStr,
    attributes: Vec<(SmolStr, SmolStr)>,
}

impl OpenTag {
    pub(crate) fn new(name: impl Into<SmolStr>, attributes: Vec<(SmolStr, SmolStr)>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub(crate) fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Process-scoped state for one parse: the model under construction, the
/// active dialect, and the caller's options. Created fresh per
/// invocation and discarded after the result is returned.
pub(crate) struct ParseContext {
    pub(crate) model: Model,
    pub(crate) dialect: Option<Dialect>,
    pub(crate) options: ParseOptions,
}

impl ParseContext {
    fn new(options: ParseOptions) -> Self {
        Self {
            model: Model::new(),
            dialect: None,
            options,
        }
    }

    pub(crate) fn prefix_namespaces(&self) -> Option<&FxHashMap<SmolStr, SmolStr>> {
        self.options.prefix_namespaces.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(options: ParseOptions) -> Self {
        Self::new(options)
    }
}

/// A stack frame for one handled open tag.
///
/// `Transparent` frames keep open and close events balanced for handlers
/// that produce no addressable node (the XMI envelope, href-only
/// references, redefined-property markers); they are invisible to parent
/// lookup.
enum Frame {
    Element(NodeId),
    Transparent,
}

/// Streaming tag-dispatch parser over one XMI document.
pub(crate) struct XmiParser {
    ctx: ParseContext,
    stack: Vec<Frame>,
}

impl XmiParser {
    pub(crate) fn new(options: ParseOptions) -> Self {
        Self {
            ctx: ParseContext::new(options),
            stack: Vec::new(),
        }
    }

    /// Drive the event stream to completion, then run the resolution
    /// pass. A tokenizer error aborts immediately with no partial
    /// result.
    pub(crate) fn parse(mut self, input: &str) -> Result<Model, ParseError> {
        let mut reader = Reader::from_str(input);
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = self.ctx.options.strict;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => self.handle_open(e)?,
                Ok(Event::Empty(ref e)) => {
                    // Self-closing element: open immediately followed by
                    // close.
                    self.handle_open(e)?;
                    self.handle_close(e.name().as_ref())?;
                }
                Ok(Event::End(ref e)) => self.handle_close(e.name().as_ref())?,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError::malformed(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
            }
        }

        let mut model = self.ctx.model;
        model.dialect = self.ctx.dialect;
        model.resolve_references();
        Ok(model)
    }

    fn handle_open(&mut self, e: &BytesStart<'_>) -> Result<(), ParseError> {
        let tag = open_tag(e)?;

        if !handlers::can_parse(tag.name(), &self.ctx)? {
            trace!(tag = tag.name(), "skipping unhandled tag");
            return Ok(());
        }
        let handler = handlers::handler_for(tag.name(), &self.ctx)?
            .ok_or_else(|| ParseError::UnknownTagHandler(tag.name().to_string()))?;

        let parent = self.parent();
        let frame = match handler(&tag, parent, &mut self.ctx)? {
            Outcome::Element(node) => Frame::Element(node),
            Outcome::Transparent => Frame::Transparent,
        };
        self.stack.push(frame);
        Ok(())
    }

    fn handle_close(&mut self, name: &[u8]) -> Result<(), ParseError> {
        let name = std::str::from_utf8(name)
            .map_err(|e| ParseError::malformed(format!("invalid tag name: {e}")))?;
        if handlers::can_parse(name, &self.ctx)? {
            self.stack.pop();
        }
        Ok(())
    }

    /// The element most recently pushed and not yet popped.
    fn parent(&self) -> Option<NodeId> {
        self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Element(node) => Some(*node),
            Frame::Transparent => None,
        })
    }
}

fn open_tag(e: &BytesStart<'_>) -> Result<OpenTag, ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| ParseError::malformed(format!("invalid tag name: {e}")))?
        .to_owned();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::malformed(format!("attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError::malformed(format!("attribute key error: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::malformed(format!("attribute value error: {e}")))?;
        attributes.push((SmolStr::new(key), SmolStr::new(value)));
    }
    Ok(OpenTag::new(name, attributes))
}
