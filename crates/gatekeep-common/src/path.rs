//! Request path normalization and comparison.
//!
//! Targets reach the interceptor in several shapes: absolute URLs built by
//! `reqwest`, relative references carrying a query string, or empty strings.
//! Everything is reduced to a [`NormalizedPath`] before it is compared with a
//! rule.
//!
//! # Examples
//!
//! ```
//! use gatekeep_common::path::{equals, normalize};
//!
//! assert_eq!(normalize("").as_str(), "/");
//! assert_eq!(normalize("users?page=2").as_str(), "/users");
//! assert_eq!(normalize("https://api.example.com/Users").as_str(), "/Users");
//! assert!(equals("/USERS", "https://api.example.com/users?x=1"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use url::Url;

/// A request path in canonical form.
///
/// Always non-empty, always starts with `/`, never carries a query string or
/// fragment. Equality and hashing ignore case, so a `NormalizedPath` can be
/// used directly as a lookup key.
#[derive(Debug, Clone)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    /// Returns the path with its original casing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the path, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || self.folded() == other.folded()
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl PartialEq<str> for NormalizedPath {
    fn eq(&self, other: &str) -> bool {
        *self == normalize(other)
    }
}

impl PartialEq<&str> for NormalizedPath {
    fn eq(&self, other: &&str) -> bool {
        *self == normalize(other)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedPath {
    fn from(path: &str) -> Self {
        normalize(path)
    }
}

/// Reduces any request target to its canonical path.
///
/// Absolute URLs contribute their path component; anything else is treated
/// as a relative reference whose query string and fragment are dropped.
/// Never fails: empty or whitespace-only input becomes `/`.
#[must_use]
pub fn normalize(path: &str) -> NormalizedPath {
    let trimmed = path.trim();

    let candidate = match Url::parse(trimmed) {
        Ok(url) if !url.cannot_be_a_base() => url.path().to_owned(),
        _ => strip_query(trimmed).to_owned(),
    };

    let candidate = candidate.trim();
    if candidate.is_empty() {
        NormalizedPath("/".to_owned())
    } else if candidate.starts_with('/') {
        NormalizedPath(candidate.to_owned())
    } else {
        NormalizedPath(format!("/{candidate}"))
    }
}

/// Compares two paths after normalization, ignoring case.
#[must_use]
pub fn equals(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Resolves the path of an outgoing request target.
///
/// Unlike [`normalize`] this is strict: it returns `None` when the target is
/// missing, or when it is an absolute URI without a hierarchical path
/// (`mailto:`, `data:` and the like), since such a request has no path a rule
/// could match.
#[must_use]
pub fn request_path(target: Option<&str>) -> Option<NormalizedPath> {
    let target = target?.trim();

    match Url::parse(target) {
        Ok(url) if url.cannot_be_a_base() => None,
        Ok(url) => Some(normalize(url.path())),
        Err(_) => Some(normalize(target)),
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}
