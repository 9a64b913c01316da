//! Namespace version schemes
//!
//! A version scheme defines how a version identifier is embedded in a
//! library namespace and how two identifiers are ordered. Schemes are
//! pluggable: the model resolves a library's `version_scheme` field against a
//! [`VersionSchemeRegistry`] at call time, so libraries may name schemes that
//! are registered later (or never).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;

use crate::error::{ModelError, Result};

/// Identifier of the built-in dotted-decimal scheme
pub const DECIMAL_DOT: &str = "decimal-dot";

/// Strategy for embedding and comparing version identifiers in namespaces
pub trait VersionScheme {
    /// Stable identifier stored in `Library::version_scheme`.
    fn scheme_id(&self) -> &str;

    /// The namespace with its version segment removed. Namespaces that do
    /// not carry a version segment are returned unchanged.
    fn base_namespace(&self, namespace: &str) -> String;

    /// Extract the version identifier embedded in a namespace.
    fn version_identifier(&self, namespace: &str) -> Result<String>;

    /// Whether an identifier is well-formed for this scheme.
    fn is_valid_version_identifier(&self, identifier: &str) -> bool;

    /// Rebuild a namespace with a new version identifier, replacing any
    /// existing version segment.
    fn set_version_identifier(&self, namespace: &str, identifier: &str) -> Result<String>;

    /// Order two version identifiers. Both must be valid for this scheme.
    fn compare_versions(&self, a: &str, b: &str) -> Result<Ordering>;
}

/// Dotted-decimal versions (`1`, `1.0`, `2.1.7`) encoded as a trailing
/// namespace segment of the form `/v1_0`. Dots become underscores in the
/// encoded segment so the identifier survives URL path rules.
pub struct DecimalDotScheme {
    identifier: Regex,
}

impl DecimalDotScheme {
    pub fn new() -> Self {
        Self {
            identifier: Regex::new(r"^[0-9]+(\.[0-9]+)*$").unwrap(),
        }
    }

    /// Split a namespace into its base and decoded version identifier.
    fn split(&self, namespace: &str) -> Option<(String, String)> {
        let trimmed = namespace.trim_end_matches('/');
        let (base, last) = trimmed.rsplit_once('/')?;
        let encoded = last.strip_prefix('v')?;
        let decoded = encoded.replace('_', ".");
        if self.identifier.is_match(&decoded) {
            Some((base.to_string(), decoded))
        } else {
            None
        }
    }

    fn invalid(&self, identifier: &str) -> ModelError {
        ModelError::InvalidVersionIdentifier {
            scheme: DECIMAL_DOT.to_string(),
            identifier: identifier.to_string(),
        }
    }
}

impl Default for DecimalDotScheme {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare one dotted segment numerically without parsing to an integer,
/// so identifiers longer than any fixed-width type still order correctly.
fn compare_segment(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

impl VersionScheme for DecimalDotScheme {
    fn scheme_id(&self) -> &str {
        DECIMAL_DOT
    }

    fn base_namespace(&self, namespace: &str) -> String {
        match self.split(namespace) {
            Some((base, _)) => base,
            None => namespace.to_string(),
        }
    }

    fn version_identifier(&self, namespace: &str) -> Result<String> {
        self.split(namespace)
            .map(|(_, id)| id)
            .ok_or_else(|| self.invalid(namespace))
    }

    fn is_valid_version_identifier(&self, identifier: &str) -> bool {
        self.identifier.is_match(identifier)
    }

    fn set_version_identifier(&self, namespace: &str, identifier: &str) -> Result<String> {
        if !self.is_valid_version_identifier(identifier) {
            return Err(self.invalid(identifier));
        }
        let base = self.base_namespace(namespace);
        let base = base.trim_end_matches('/');
        Ok(format!("{base}/v{}", identifier.replace('.', "_")))
    }

    fn compare_versions(&self, a: &str, b: &str) -> Result<Ordering> {
        if !self.is_valid_version_identifier(a) {
            return Err(self.invalid(a));
        }
        if !self.is_valid_version_identifier(b) {
            return Err(self.invalid(b));
        }
        let left: Vec<&str> = a.split('.').collect();
        let right: Vec<&str> = b.split('.').collect();
        // Missing trailing segments count as zero: 1.2 == 1.2.0.
        for i in 0..left.len().max(right.len()) {
            let la = left.get(i).copied().unwrap_or("0");
            let rb = right.get(i).copied().unwrap_or("0");
            match compare_segment(la, rb) {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Version schemes known to a model, keyed by scheme id
pub struct VersionSchemeRegistry {
    schemes: HashMap<String, Rc<dyn VersionScheme>>,
}

impl VersionSchemeRegistry {
    /// An empty registry with no schemes at all.
    pub fn empty() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    /// Register a scheme, replacing any scheme with the same id.
    pub fn register(&mut self, scheme: Rc<dyn VersionScheme>) {
        self.schemes.insert(scheme.scheme_id().to_string(), scheme);
    }

    pub fn get(&self, scheme_id: &str) -> Option<Rc<dyn VersionScheme>> {
        self.schemes.get(scheme_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schemes.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for VersionSchemeRegistry {
    /// Registry preloaded with the dotted-decimal scheme.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Rc::new(DecimalDotScheme::new()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> DecimalDotScheme {
        DecimalDotScheme::new()
    }

    #[test]
    fn test_version_identifier_parsing() {
        let s = scheme();
        assert_eq!(
            s.version_identifier("http://example.org/ns/v1").unwrap(),
            "1"
        );
        assert_eq!(
            s.version_identifier("http://example.org/ns/v1_10_2").unwrap(),
            "1.10.2"
        );
        assert_eq!(
            s.base_namespace("http://example.org/ns/v1_10_2"),
            "http://example.org/ns"
        );
    }

    #[test]
    fn test_unversioned_namespace() {
        let s = scheme();
        assert_eq!(s.base_namespace("http://example.org/ns"), "http://example.org/ns");
        assert!(s.version_identifier("http://example.org/ns").is_err());
        // A trailing segment that merely starts with `v` is not a version.
        assert!(s.version_identifier("http://example.org/vocab").is_err());
    }

    #[test]
    fn test_set_version_identifier() {
        let s = scheme();
        assert_eq!(
            s.set_version_identifier("http://example.org/ns", "2.0").unwrap(),
            "http://example.org/ns/v2_0"
        );
        // Replaces an existing version segment instead of stacking.
        assert_eq!(
            s.set_version_identifier("http://example.org/ns/v1", "1.1").unwrap(),
            "http://example.org/ns/v1_1"
        );
        assert!(s.set_version_identifier("http://example.org/ns", "1.beta").is_err());
    }

    #[test]
    fn test_compare_versions_numeric_segments() {
        let s = scheme();
        assert_eq!(s.compare_versions("1.10", "1.2").unwrap(), Ordering::Greater);
        assert_eq!(s.compare_versions("1.2", "1.10").unwrap(), Ordering::Less);
        assert_eq!(s.compare_versions("2", "1.9.9").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_versions_missing_segments_are_zero() {
        let s = scheme();
        assert_eq!(s.compare_versions("1", "1.0").unwrap(), Ordering::Equal);
        assert_eq!(s.compare_versions("1.0.0", "1").unwrap(), Ordering::Equal);
        assert_eq!(s.compare_versions("1.0.1", "1").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_versions_rejects_invalid() {
        let s = scheme();
        assert!(s.compare_versions("1.a", "1").is_err());
        assert!(s.compare_versions("1", "").is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = VersionSchemeRegistry::default();
        assert!(registry.get(DECIMAL_DOT).is_some());
        assert!(registry.get("lexical").is_none());
        assert_eq!(registry.ids(), vec![DECIMAL_DOT.to_string()]);
    }
}
