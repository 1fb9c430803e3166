//! Role authorizer
//!
//! Decides whether a caller's role set may reach an endpoint category.
//! `public` is always allowed; every other category is denied unless an
//! authorization rule for it lists at least one of the caller's roles.

use crate::access_control::roles::{RoleNormalizer, RoleSet};
use crate::access_control::types::{AccessDecision, EndpointCategory};
use crate::config::AuthorizationRuleConfig;
use crate::error::{ConfigError, PolicyError};
use std::collections::BTreeSet;
use tracing::trace;

/// Compiled authorization rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRule {
    category: EndpointCategory,
    roles: BTreeSet<String>,
}

impl AuthorizationRule {
    pub fn new<I, S>(category: EndpointCategory, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn category(&self) -> EndpointCategory {
        self.category
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Whether the caller holds any permitted role
    fn permits(&self, caller: &RoleSet) -> bool {
        self.roles.iter().any(|r| caller.contains(r))
    }
}

/// Ordered authorization rule table
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    rules: Vec<AuthorizationRule>,
}

impl RoleAuthorizer {
    pub fn new(rules: Vec<AuthorizationRule>) -> Self {
        Self { rules }
    }

    /// Compile the rule table from configuration
    ///
    /// Role names go through the same normalizer as incoming headers so that
    /// `Branch Manager` in a rule matches `branch-manager` on the wire.
    pub fn from_config(
        rules: &[AuthorizationRuleConfig],
        normalizer: &RoleNormalizer,
    ) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let category = EndpointCategory::try_parse(&rule.category).ok_or_else(|| {
                PolicyError::UnknownCategory {
                    table: "authorization",
                    label: rule.category.clone(),
                }
            })?;
            compiled.push(AuthorizationRule::new(
                category,
                rule.roles.iter().map(|r| normalizer.canonical(r)),
            ));
        }
        Ok(Self::new(compiled))
    }

    /// Whether `roles` may reach `category`
    pub fn authorize(&self, category: EndpointCategory, roles: &RoleSet) -> bool {
        self.check(category, roles).is_allowed()
    }

    /// Like [`authorize`](Self::authorize), with a reason on denial
    pub fn check(&self, category: EndpointCategory, roles: &RoleSet) -> AccessDecision {
        if category.is_public() {
            return AccessDecision::Allowed;
        }

        let mut has_rule = false;
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.category != category {
                continue;
            }
            has_rule = true;
            if rule.permits(roles) {
                trace!(%category, index, "Matched authorization rule");
                return AccessDecision::Allowed;
            }
        }

        if !has_rule {
            AccessDecision::Denied(format!("no authorization rule for category '{}'", category))
        } else if roles.is_empty() {
            AccessDecision::Denied("caller has no roles".to_string())
        } else {
            AccessDecision::Denied(format!(
                "roles [{}] are not permitted for '{}'",
                roles, category
            ))
        }
    }

    /// Whether any rule targets `category`
    pub fn covers(&self, category: EndpointCategory) -> bool {
        category.is_public() || self.rules.iter().any(|r| r.category == category)
    }

    /// Union of roles permitted for `category` across all its rules
    pub fn permitted_roles(&self, category: EndpointCategory) -> BTreeSet<&str> {
        self.rules
            .iter()
            .filter(|r| r.category == category)
            .flat_map(|r| r.roles())
            .collect()
    }

    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Reject rules that can never grant access or target `public`
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.category.is_public() {
                return Err(PolicyError::PublicAuthorization { index });
            }
            if rule.roles.is_empty() {
                return Err(PolicyError::EmptyRoles {
                    index,
                    category: rule.category,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> RoleSet {
        names.iter().copied().collect()
    }

    fn authorizer() -> RoleAuthorizer {
        RoleAuthorizer::new(vec![
            AuthorizationRule::new(EndpointCategory::CommonTellers, ["cashier", "branch-manager"]),
            AuthorizationRule::new(EndpointCategory::Admin, ["admin"]),
        ])
    }

    #[test]
    fn test_public_always_allowed() {
        let authz = RoleAuthorizer::default();
        assert!(authz.authorize(EndpointCategory::Public, &RoleSet::new()));
        assert!(authz.authorize(EndpointCategory::Public, &roles(&["anyone"])));
    }

    #[test]
    fn test_or_semantics() {
        let authz = authorizer();
        assert!(authz.authorize(EndpointCategory::CommonTellers, &roles(&["branch-manager"])));
        assert!(authz.authorize(EndpointCategory::CommonTellers, &roles(&["cashier"])));
        assert!(!authz.authorize(EndpointCategory::CommonTellers, &roles(&["admin"])));
    }

    #[test]
    fn test_missing_category_denied() {
        let authz = authorizer();
        let decision = authz.check(EndpointCategory::Accountant, &roles(&["accountant"]));
        assert!(decision.is_denied());
        assert_eq!(
            decision,
            AccessDecision::Denied("no authorization rule for category 'accountant'".to_string())
        );
    }

    #[test]
    fn test_empty_roles_denied() {
        let decision = authorizer().check(EndpointCategory::Admin, &RoleSet::new());
        assert_eq!(
            decision,
            AccessDecision::Denied("caller has no roles".to_string())
        );
    }

    #[test]
    fn test_later_rule_for_same_category_consulted() {
        let authz = RoleAuthorizer::new(vec![
            AuthorizationRule::new(EndpointCategory::Admin, ["admin"]),
            AuthorizationRule::new(EndpointCategory::Admin, ["super-admin"]),
        ]);
        assert!(authz.authorize(EndpointCategory::Admin, &roles(&["super-admin"])));
        assert_eq!(
            authz
                .permitted_roles(EndpointCategory::Admin)
                .into_iter()
                .collect::<Vec<_>>(),
            vec!["admin", "super-admin"]
        );
    }

    #[test]
    fn test_from_config_normalizes_roles() {
        let normalizer = RoleNormalizer::new(&crate::config::RoleConfig::default());
        let authz = RoleAuthorizer::from_config(
            &[AuthorizationRuleConfig {
                category: "branch-manager".to_string(),
                roles: vec!["Branch Manager".to_string()],
            }],
            &normalizer,
        )
        .unwrap();
        assert!(authz.authorize(EndpointCategory::BranchManager, &roles(&["branch-manager"])));
    }

    #[test]
    fn test_from_config_unknown_category() {
        let result = RoleAuthorizer::from_config(
            &[AuthorizationRuleConfig {
                category: "tellers".to_string(),
                roles: vec!["cashier".to_string()],
            }],
            &RoleNormalizer::identity(),
        );
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Policy(PolicyError::UnknownCategory {
                table: "authorization",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_public_and_empty() {
        let authz = RoleAuthorizer::new(vec![AuthorizationRule::new(
            EndpointCategory::Public,
            ["admin"],
        )]);
        assert_eq!(
            authz.validate().unwrap_err(),
            PolicyError::PublicAuthorization { index: 0 }
        );

        let authz = RoleAuthorizer::new(vec![AuthorizationRule::new(
            EndpointCategory::Cashier,
            Vec::<String>::new(),
        )]);
        assert_eq!(
            authz.validate().unwrap_err(),
            PolicyError::EmptyRoles {
                index: 0,
                category: EndpointCategory::Cashier,
            }
        );
    }

    #[test]
    fn test_covers() {
        let authz = authorizer();
        assert!(authz.covers(EndpointCategory::Public));
        assert!(authz.covers(EndpointCategory::Admin));
        assert!(!authz.covers(EndpointCategory::Cashier));
    }
}
