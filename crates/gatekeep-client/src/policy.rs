//! Anonymous-path decisions.
//!
//! Evaluation order, first match wins:
//!
//! 1. The health endpoint is always anonymous.
//! 2. A method-scoped entry for the path decides alone: an empty method list
//!    denies, `*` or the request method allows, anything else denies.
//! 3. Otherwise the path is anonymous only if it is blanketed.

use std::fmt;

use gatekeep_common::path::normalize;
use gatekeep_common::{ANY_METHOD, AnonymousRules, HEALTH_PATH, NormalizedPath};

/// Decides whether `method` on `path` may go out without a token.
///
/// # Examples
///
/// ```
/// use gatekeep_client::policy::is_anonymous;
/// use gatekeep_common::AnonymousRules;
///
/// let rules = AnonymousRules::new()
///     .with_path("/public")
///     .with_methods("/admin", ["*"]);
///
/// assert!(is_anonymous("DELETE", "/admin", &rules));
/// assert!(is_anonymous("POST", "/public", &rules));
/// assert!(!is_anonymous("GET", "/other", &rules));
/// assert!(is_anonymous("GET", "/health", &AnonymousRules::new()));
/// ```
#[must_use]
pub fn is_anonymous(method: &str, path: &str, rules: &AnonymousRules) -> bool {
    evaluate(method, &normalize(path), rules)
}

fn evaluate(method: &str, path: &NormalizedPath, rules: &AnonymousRules) -> bool {
    if *path == HEALTH_PATH {
        return true;
    }

    if let Some(methods) = rules.method_rule(path) {
        let method = method.trim();
        return methods
            .iter()
            .map(|m| m.trim())
            .any(|m| m == ANY_METHOD || m.eq_ignore_ascii_case(method));
    }

    rules.is_blanketed(path)
}

/// Pluggable anonymous-path strategy.
///
/// [`AnonymousRules`] is the stock implementation. The health endpoint stays
/// anonymous whatever a custom strategy answers; the authenticator checks it
/// before consulting the strategy.
pub trait AnonymousPolicy: fmt::Debug + Send + Sync {
    /// Returns `true` when `method` on `path` needs no token.
    fn is_anonymous(&self, method: &str, path: &NormalizedPath) -> bool;
}

impl AnonymousPolicy for AnonymousRules {
    fn is_anonymous(&self, method: &str, path: &NormalizedPath) -> bool {
        evaluate(method, path, self)
    }
}
