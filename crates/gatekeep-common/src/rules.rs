//! Declarative anonymous-path rules.
//!
//! A rule set has two layers. *Blanket* paths are exempt from authentication
//! for every method. *Method-scoped* paths list the methods that may go out
//! unauthenticated; when a path appears there, that entry alone decides the
//! outcome, even if the same path is also blanketed.
//!
//! ```toml
//! paths = ["/public"]
//!
//! [methods]
//! "/admin" = ["*"]
//! "/reports" = ["GET", "HEAD"]
//! "/locked" = []
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::{NormalizedPath, normalize};

/// Wildcard accepted in a method-scoped rule, matching every method.
pub const ANY_METHOD: &str = "*";

/// Anonymous-path rule set for one controller section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousRules {
    /// Paths exempt from authentication for all methods.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Paths exempt only for the listed methods. An empty list denies.
    ///
    /// Kept sorted so that, when two keys normalize to the same path, the
    /// first in sorted order always wins.
    #[serde(default)]
    pub methods: BTreeMap<String, Vec<String>>,
}

impl AnonymousRules {
    /// Creates an empty rule set. No path other than the built-in health
    /// endpoint is anonymous.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a blanket path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Adds a method-scoped path.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeep_common::AnonymousRules;
    ///
    /// let rules = AnonymousRules::new()
    ///     .with_path("/public")
    ///     .with_methods("/admin", ["*"])
    ///     .with_methods("/locked", Vec::<String>::new());
    ///
    /// assert_eq!(rules.methods.len(), 2);
    /// ```
    #[must_use]
    pub fn with_methods<I, S>(mut self, path: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods
            .insert(path.into(), methods.into_iter().map(Into::into).collect());
        self
    }

    /// Finds the method-scoped entry whose key normalizes to `path`.
    #[must_use]
    pub fn method_rule(&self, path: &NormalizedPath) -> Option<&[String]> {
        self.methods
            .iter()
            .find(|(key, _)| normalize(key) == *path)
            .map(|(_, methods)| methods.as_slice())
    }

    /// Returns `true` when `path` matches one of the blanket paths.
    #[must_use]
    pub fn is_blanketed(&self, path: &NormalizedPath) -> bool {
        self.paths.iter().any(|p| normalize(p) == *path)
    }

    /// Returns `true` when no rules are declared at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_method_rule_lookup_is_normalized() {
        let rules = AnonymousRules::new().with_methods("Admin/", ["GET"]);
        assert!(rules.method_rule(&normalize("/admin/")).is_some());
        assert!(rules.method_rule(&normalize("/ADMIN/?q=1")).is_some());
        assert!(rules.method_rule(&normalize("/admin/users")).is_none());
    }

    #[test]
    fn test_empty_method_list_is_still_a_match() {
        let rules = AnonymousRules::new().with_methods("/locked", Vec::<String>::new());
        assert_eq!(rules.method_rule(&normalize("/locked")), Some(&[][..]));
    }

    #[test]
    fn test_duplicate_normalized_keys_resolve_in_sorted_order() {
        let rules = AnonymousRules::new()
            .with_methods("/x", ["POST"])
            .with_methods("/X", ["GET"]);
        // "/X" sorts before "/x"
        assert_eq!(
            rules.method_rule(&normalize("/x")),
            Some(&["GET".to_string()][..])
        );
    }

    #[test]
    fn test_blanket_paths() {
        let rules = AnonymousRules::new().with_path("public");
        assert!(rules.is_blanketed(&normalize("/Public")));
        assert!(!rules.is_blanketed(&normalize("/private")));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let rules: AnonymousRules = toml::from_str(
            r#"
            paths = ["/public"]

            [methods]
            "/admin" = ["*"]
            "/locked" = []
            "#,
        )
        .unwrap();

        assert_eq!(rules.paths, vec!["/public".to_string()]);
        assert_eq!(rules.methods["/admin"], vec![ANY_METHOD.to_string()]);
        assert!(rules.methods["/locked"].is_empty());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let rules: AnonymousRules = toml::from_str("").unwrap();
        assert!(rules.is_empty());
    }
}
