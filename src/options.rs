//! Parse configuration.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Options accepted by [`parse`](crate::parse).
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Strip per-tag-kind bookkeeping fields (raw bounds, aggregation
    /// markers, raw identifiers on already-indexed elements) from the
    /// final element records. Defaults to `false`.
    pub clean: bool,
    /// Passed to the XML tokenizer to control tolerance of malformed
    /// markup. Defaults to `true`.
    pub strict: bool,
    /// Caller-supplied table canonicalizing raw namespace/file-prefix
    /// strings (`"BPMNDI.cmof"`) to short prefixes (`"bpmndi"`) in
    /// cross-document references. Absent means no canonicalization.
    pub prefix_namespaces: Option<FxHashMap<SmolStr, SmolStr>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            clean: false,
            strict: true,
            prefix_namespaces: None,
        }
    }
}

impl ParseOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `clean` flag.
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Set the `strict` flag.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the prefix→namespace table.
    pub fn with_prefix_namespaces<I, K, V>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SmolStr>,
        V: Into<SmolStr>,
    {
        self.prefix_namespaces = Some(
            table
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }
}
