//! Field vocabulary shared by flattening, diffing and command synthesis
//!
//! All tables are literal and built once.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Flat key separator
pub const SEP: char = '.';

/// Reserved pseudo-field recording a section instance's list position
pub const INDEX_KEY: &str = "<index>";

/// Preferred identity field of a section instance
pub const NAME_KEY: &str = "name";

/// Fallback identity field for typed sections
pub const TYPE_KEY: &str = "type";

/// Fields whose value is a repeated named section
const LIST_SECTIONS: &[&str] = &["namespaces", "sets", "dcs", "tls", "logging"];

/// Sections identified by their `type` rather than a name
const TYPED_SECTIONS: &[&str] = &["storage-engine", "index-type", "sindex-type"];

/// Singular command token and plural storage form of list fields
const SINGULAR_PLURAL: &[(&str, &str)] = &[
    ("access-address", "access-addresses"),
    ("address", "addresses"),
    ("alternate-access-address", "alternate-access-addresses"),
    ("dc", "dcs"),
    ("device", "devices"),
    ("feature-key-file", "feature-key-files"),
    ("file", "files"),
    ("http-url", "http-urls"),
    ("ignore-bin", "ignore-bins"),
    ("ignore-set", "ignore-sets"),
    ("mesh-seed-address-port", "mesh-seed-address-ports"),
    ("mount", "mounts"),
    ("multicast-group", "multicast-groups"),
    ("namespace", "namespaces"),
    ("node-address-port", "node-address-ports"),
    ("role-query-pattern", "role-query-patterns"),
    ("set", "sets"),
    ("ship-bin", "ship-bins"),
    ("ship-set", "ship-sets"),
    ("tls-access-address", "tls-access-addresses"),
    ("tls-address", "tls-addresses"),
    ("tls-alternate-access-address", "tls-alternate-access-addresses"),
    ("tls-mesh-seed-address-port", "tls-mesh-seed-address-ports"),
];

static PLURAL_OF: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SINGULAR_PLURAL.iter().copied().collect());

static SINGULAR_OF: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SINGULAR_PLURAL.iter().map(|&(s, p)| (p, s)).collect());

/// Check if a field holds a repeated named section
#[inline]
#[must_use]
pub fn is_list_section(field: &str) -> bool {
    LIST_SECTIONS.contains(&field)
}

/// Check if a field is a section identified by its `type`
#[inline]
#[must_use]
pub fn is_typed_section(field: &str) -> bool {
    TYPED_SECTIONS.contains(&field)
}

/// Command-vocabulary form of a stored field name
///
/// Names without a plural form are returned unchanged.
#[must_use]
pub fn singular_of(field: &str) -> &str {
    SINGULAR_OF.get(field).copied().unwrap_or(field)
}

/// Storage form of a command-vocabulary field name
///
/// Names without a singular form are returned unchanged.
#[must_use]
pub fn plural_of(field: &str) -> &str {
    PLURAL_OF.get(field).copied().unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn singular_plural_are_inverse() {
        for &(singular, plural) in SINGULAR_PLURAL {
            assert_eq!(singular_of(plural), singular);
            assert_eq!(plural_of(singular), plural);
        }
    }

    #[test]
    fn forms_are_unique() {
        let singulars: HashSet<_> = SINGULAR_PLURAL.iter().map(|(s, _)| s).collect();
        let plurals: HashSet<_> = SINGULAR_PLURAL.iter().map(|(_, p)| p).collect();
        assert_eq!(singulars.len(), SINGULAR_PLURAL.len());
        assert_eq!(plurals.len(), SINGULAR_PLURAL.len());
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(singular_of("proto-fd-max"), "proto-fd-max");
        assert_eq!(plural_of("tls"), "tls");
    }

    #[test]
    fn section_tables() {
        assert!(is_list_section("namespaces"));
        assert!(!is_list_section("service"));
        assert!(is_typed_section("storage-engine"));
        assert!(!is_typed_section("namespaces"));
    }
}
