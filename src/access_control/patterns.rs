//! Pattern matching for endpoint classification
//!
//! Request patterns use the key syntax of NGINX `map` blocks and are matched
//! against the request key `METHOD:PATH`:
//!
//! - `~regex` case-sensitive regular expression
//! - `~*regex` case-insensitive regular expression
//! - `literal*` prefix
//! - `literal` exact

use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Compiled request pattern
#[derive(Debug, Clone)]
pub struct RequestPattern {
    source: String,
    kind: PatternKind,
}

#[derive(Debug, Clone)]
enum PatternKind {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl RequestPattern {
    /// Compile a pattern from its source text
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let kind = if let Some(rest) = pattern.strip_prefix("~*") {
            PatternKind::Regex(compile_regex(pattern, rest, true)?)
        } else if let Some(rest) = pattern.strip_prefix('~') {
            PatternKind::Regex(compile_regex(pattern, rest, false)?)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            PatternKind::Prefix(prefix.to_string())
        } else {
            PatternKind::Exact(pattern.to_string())
        };

        if matches!(&kind, PatternKind::Exact(s) | PatternKind::Prefix(s) if s.is_empty()) {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }

        Ok(Self {
            source: pattern.to_string(),
            kind,
        })
    }

    /// Check if a request key matches this pattern
    pub fn matches(&self, request_key: &str) -> bool {
        match &self.kind {
            PatternKind::Exact(literal) => request_key == literal,
            PatternKind::Prefix(prefix) => request_key.starts_with(prefix.as_str()),
            PatternKind::Regex(regex) => regex.is_match(request_key),
        }
    }

    /// The pattern as written in configuration
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The literal text for exact and prefix patterns
    ///
    /// Regex patterns have no literal and return `None`.
    pub fn literal(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Exact(s) | PatternKind::Prefix(s) => Some(s),
            PatternKind::Regex(_) => None,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self.kind, PatternKind::Regex(_))
    }
}

impl fmt::Display for RequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn compile_regex(source: &str, body: &str, case_insensitive: bool) -> Result<Regex, ConfigError> {
    RegexBuilder::new(body)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })
}

/// Build the request key patterns are matched against
///
/// The method is upper-cased, any query string or fragment is dropped and
/// the path is canonicalized as in [`normalize_path`]. A `..` that would
/// climb above the root is dropped here; callers that must refuse such
/// paths check [`normalize_path`] first.
pub fn request_key(method: &str, path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let (path, _) = resolve_segments(path);
    format!("{}:{}", method.trim().to_ascii_uppercase(), path)
}

/// Canonical form of a decoded request path
///
/// Repeated slashes collapse, `;` path parameters are removed from each
/// segment, `.` and `..` segments are resolved and a trailing slash is
/// dropped. This is the path the upstream servlet container routes on.
/// Returns `None` when a `..` segment would climb above the root.
pub fn normalize_path(path: &str) -> Option<String> {
    match resolve_segments(path) {
        (path, false) => Some(path),
        (_, true) => None,
    }
}

/// Resolved path plus whether a `..` tried to leave the root
fn resolve_segments(path: &str) -> (String, bool) {
    let mut segments: Vec<&str> = Vec::new();
    let mut escaped = false;

    for segment in path.split('/') {
        let segment = segment.split(';').next().unwrap_or_default();
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    escaped = true;
                }
            }
            segment => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return ("/".to_string(), escaped);
    }

    let mut resolved = String::with_capacity(path.len());
    for segment in segments {
        resolved.push('/');
        resolved.push_str(segment);
    }
    (resolved, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let pattern = RequestPattern::new("GET:/v1/offices").unwrap();
        assert!(pattern.matches("GET:/v1/offices"));
        assert!(!pattern.matches("GET:/v1/offices/1"));
        assert!(!pattern.matches("POST:/v1/offices"));
        assert_eq!(pattern.literal(), Some("GET:/v1/offices"));
    }

    #[test]
    fn test_prefix_match() {
        let pattern = RequestPattern::new("GET:/v1/offices*").unwrap();
        assert!(pattern.matches("GET:/v1/offices"));
        assert!(pattern.matches("GET:/v1/offices/1"));
        assert!(!pattern.matches("GET:/v1/office"));
        assert_eq!(pattern.literal(), Some("GET:/v1/offices"));
    }

    #[test]
    fn test_regex_match() {
        let pattern = RequestPattern::new("~^GET:/v1/loans/[0-9]+$").unwrap();
        assert!(pattern.matches("GET:/v1/loans/1"));
        assert!(pattern.matches("GET:/v1/loans/42"));
        assert!(!pattern.matches("GET:/v1/loans"));
        assert!(!pattern.matches("GET:/v1/loans/abc"));
        assert!(pattern.is_regex());
        assert_eq!(pattern.literal(), None);
    }

    #[test]
    fn test_case_insensitive_regex() {
        let pattern = RequestPattern::new("~*^get:/v1/Tellers").unwrap();
        assert!(pattern.matches("GET:/v1/tellers"));
        let sensitive = RequestPattern::new("~^get:/v1/Tellers").unwrap();
        assert!(!sensitive.matches("GET:/v1/tellers"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = RequestPattern::new("~[invalid");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(RequestPattern::new("").is_err());
        assert!(RequestPattern::new("*").is_err());
    }

    #[test]
    fn test_request_key() {
        assert_eq!(request_key("get", "/v1/clients"), "GET:/v1/clients");
        assert_eq!(
            request_key("POST", "/v1/loans/1?command=approve"),
            "POST:/v1/loans/1"
        );
        assert_eq!(request_key(" put ", "/v1/x#frag"), "PUT:/v1/x");
    }

    #[test]
    fn test_request_key_canonicalizes_path() {
        assert_eq!(request_key("GET", "/v1//users"), "GET:/v1/users");
        assert_eq!(request_key("GET", "/v1/./users/"), "GET:/v1/users");
        assert_eq!(
            request_key("DELETE", "/v1/glaccounts/../users?x=1"),
            "DELETE:/v1/users"
        );
        assert_eq!(request_key("GET", "/../v1/users"), "GET:/v1/users");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/v1/users").as_deref(), Some("/v1/users"));
        assert_eq!(normalize_path("//v1///users//").as_deref(), Some("/v1/users"));
        assert_eq!(normalize_path("/v1/x/../users").as_deref(), Some("/v1/users"));
        assert_eq!(normalize_path("/v1/users;jsessionid=1").as_deref(), Some("/v1/users"));
        assert_eq!(normalize_path("/v1/x/..;/users").as_deref(), Some("/v1/users"));
        assert_eq!(normalize_path("").as_deref(), Some("/"));
        assert_eq!(normalize_path("/v1/.."), Some("/".to_string()));
        assert_eq!(normalize_path("/v1/../../users"), None);
    }
}
