//! Caller role sets
//!
//! The authentication layer forwards the caller's roles as a single header
//! value. A value containing a comma is split on commas only, so display
//! names such as `Branch Manager` stay intact; otherwise it is split on
//! whitespace.

use crate::config::RoleConfig;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Unordered set of role names asserted for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Create an empty role set
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a header value into a role set without normalizing names
    pub fn parse(header: &str) -> Self {
        split_roles(header).into_iter().map(str::to_string).collect()
    }

    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        self.0.insert(role.into())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

fn split_roles(header: &str) -> Vec<&str> {
    let tokens: Vec<&str> = if header.contains(',') {
        header.split(',').collect()
    } else {
        header.split_whitespace().collect()
    };
    tokens
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Maps incoming role names onto the canonical names used by rules
#[derive(Debug, Clone, Default)]
pub struct RoleNormalizer {
    normalize: bool,
    aliases: HashMap<String, String>,
}

impl RoleNormalizer {
    pub fn new(config: &RoleConfig) -> Self {
        let mut normalizer = Self {
            normalize: config.normalize,
            aliases: HashMap::with_capacity(config.aliases.len()),
        };
        for (from, to) in &config.aliases {
            let from = normalizer.normalize_name(from);
            let to = normalizer.normalize_name(to);
            normalizer.aliases.insert(from, to);
        }
        normalizer
    }

    /// Normalizer that leaves names untouched
    pub fn identity() -> Self {
        Self::default()
    }

    /// Canonical name for a role
    ///
    /// Aliases resolve a single step; the target is not looked up again.
    pub fn canonical(&self, role: &str) -> String {
        let name = self.normalize_name(role);
        match self.aliases.get(&name) {
            Some(target) => target.clone(),
            None => name,
        }
    }

    /// Parse a header value into a canonical role set
    pub fn parse_header(&self, header: &str) -> RoleSet {
        split_roles(header)
            .into_iter()
            .map(|r| self.canonical(r))
            .collect()
    }

    fn normalize_name(&self, role: &str) -> String {
        let role = role.trim();
        if !self.normalize {
            return role.to_string();
        }

        let mut out = String::with_capacity(role.len());
        let mut pending_sep = false;
        for c in role.chars() {
            if c.is_whitespace() || c == '_' || c == '-' {
                pending_sep = !out.is_empty();
            } else {
                if pending_sep {
                    out.push('-');
                    pending_sep = false;
                }
                out.extend(c.to_lowercase());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(aliases: &[(&str, &str)]) -> RoleNormalizer {
        RoleNormalizer::new(&RoleConfig {
            normalize: true,
            aliases: aliases
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        })
    }

    #[test]
    fn test_parse_comma_delimited() {
        let roles = RoleSet::parse("cashier, branch-manager,,admin");
        assert_eq!(roles.len(), 3);
        assert!(roles.contains("cashier"));
        assert!(roles.contains("branch-manager"));
        assert!(roles.contains("admin"));
    }

    #[test]
    fn test_parse_space_delimited() {
        let roles = RoleSet::parse("  cashier   admin ");
        assert_eq!(roles.len(), 2);
        assert!(roles.contains("admin"));
    }

    #[test]
    fn test_parse_empty_and_duplicates() {
        assert!(RoleSet::parse("").is_empty());
        assert!(RoleSet::parse(" , ,").is_empty());
        assert_eq!(RoleSet::parse("admin,admin").len(), 1);
    }

    #[test]
    fn test_normalize_display_names() {
        let n = normalizer(&[]);
        assert_eq!(n.canonical("Branch Manager"), "branch-manager");
        assert_eq!(n.canonical("loan_officer"), "loan-officer");
        assert_eq!(n.canonical("  Super   user "), "super-user");
        assert_eq!(n.canonical("ADMIN"), "admin");
    }

    #[test]
    fn test_normalize_hyphen_runs() {
        let n = normalizer(&[]);
        assert_eq!(n.canonical("Branch - Manager"), "branch-manager");
        assert_eq!(n.canonical("account-manager"), "account-manager");
        assert_eq!(n.canonical("-cashier_-"), "cashier");
        assert_eq!(n.canonical("loan__-officer"), "loan-officer");
    }

    #[test]
    fn test_aliases_are_single_step() {
        let n = normalizer(&[("Teller", "cashier"), ("cashier", "admin")]);
        assert_eq!(n.canonical("teller"), "cashier");
        assert_eq!(n.canonical("cashier"), "admin");
    }

    #[test]
    fn test_parse_header_with_display_names() {
        let n = normalizer(&[("super-user", "admin")]);
        let roles = n.parse_header("Branch Manager, Super user");
        assert!(roles.contains("branch-manager"));
        assert!(roles.contains("admin"));
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn test_identity_keeps_names() {
        let n = RoleNormalizer::identity();
        assert_eq!(n.canonical("Branch_Manager"), "Branch_Manager");
    }

    #[test]
    fn test_display_is_sorted() {
        let roles: RoleSet = ["cashier", "admin"].into_iter().collect();
        assert_eq!(roles.to_string(), "admin,cashier");
    }
}
