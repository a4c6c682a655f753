//! Namespace-qualified name canonicalization.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Rewrite a namespace-scoped qualified name (`prefix#Local` or
/// `prefix::Local`) into its canonical `prefix:Local` form using the
/// caller-supplied prefix table.
///
/// Passthrough when no table is supplied or the input carries no
/// separator; a left segment missing from the table is kept as-is.
pub(crate) fn resolve_qualified(
    name: &str,
    table: Option<&FxHashMap<SmolStr, SmolStr>>,
) -> SmolStr {
    let Some(table) = table else {
        return SmolStr::new(name);
    };
    let Some((head, tail)) = split_qualified(name) else {
        return SmolStr::new(name);
    };
    let head = table.get(head).map(SmolStr::as_str).unwrap_or(head);
    SmolStr::new(format!("{head}:{tail}"))
}

/// Split on the first `#` or `::`, whichever comes first.
fn split_qualified(name: &str) -> Option<(&str, &str)> {
    match (name.find('#'), name.find("::")) {
        (Some(hash), Some(colons)) if colons < hash => Some((&name[..colons], &name[colons + 2..])),
        (Some(hash), _) => Some((&name[..hash], &name[hash + 1..])),
        (None, Some(colons)) => Some((&name[..colons], &name[colons + 2..])),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> FxHashMap<SmolStr, SmolStr> {
        entries
            .iter()
            .map(|(k, v)| (SmolStr::new(k), SmolStr::new(v)))
            .collect()
    }

    #[test]
    fn passthrough_without_table() {
        assert_eq!(resolve_qualified("DC.cmof#Bounds", None), "DC.cmof#Bounds");
    }

    #[test]
    fn passthrough_without_separator() {
        let table = table(&[("DC.cmof", "dc")]);
        assert_eq!(resolve_qualified("Bounds", Some(&table)), "Bounds");
    }

    #[test]
    fn rewrites_hash_separated_references() {
        let table = table(&[("DC.cmof", "dc")]);
        assert_eq!(resolve_qualified("DC.cmof#Bounds", Some(&table)), "dc:Bounds");
    }

    #[test]
    fn rewrites_double_colon_separated_references() {
        let table = table(&[("BPMN20.cmof", "bpmn")]);
        assert_eq!(
            resolve_qualified("BPMN20.cmof::BaseElement", Some(&table)),
            "bpmn:BaseElement"
        );
    }

    #[test]
    fn unknown_prefix_is_kept() {
        let table = table(&[("DC.cmof", "dc")]);
        assert_eq!(
            resolve_qualified("DI.cmof#Shape", Some(&table)),
            "DI.cmof:Shape"
        );
    }
}
