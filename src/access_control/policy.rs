//! Access policy
//!
//! Binds the classifier, the authorizer and role normalization into one
//! immutable, validated object. A policy is never mutated after
//! construction; reloads build a fresh one (see [`crate::access_control::PolicyStore`]).

use crate::access_control::authorizer::RoleAuthorizer;
use crate::access_control::classifier::EndpointClassifier;
use crate::access_control::roles::{RoleNormalizer, RoleSet};
use crate::access_control::types::{AccessDecision, EndpointCategory};
use crate::config::AppConfig;
use crate::error::{AccessDeniedError, ConfigError, PolicyError};
use serde::Serialize;
use tracing::debug;

/// Outcome of evaluating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub category: EndpointCategory,
    pub access: AccessDecision,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        self.access.is_allowed()
    }

    /// HTTP status the forward-auth endpoint answers with
    pub fn status_code(&self) -> u16 {
        if self.is_allowed() { 200 } else { 403 }
    }
}

/// Validated classifier + authorizer pair
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    classifier: EndpointClassifier,
    authorizer: RoleAuthorizer,
    roles: RoleNormalizer,
}

impl AccessPolicy {
    /// Build and validate a policy
    ///
    /// Fails if either table is malformed or if the classifier can produce a
    /// category the authorizer has no rule for.
    pub fn new(
        classifier: EndpointClassifier,
        authorizer: RoleAuthorizer,
        roles: RoleNormalizer,
    ) -> Result<Self, PolicyError> {
        classifier.validate()?;
        authorizer.validate()?;

        for category in classifier.categories() {
            if !authorizer.covers(category) {
                return Err(PolicyError::UnreachableCategory(category));
            }
        }

        Ok(Self {
            classifier,
            authorizer,
            roles,
        })
    }

    /// Compile a policy from loaded configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let roles = RoleNormalizer::new(&config.roles);
        let classifier = EndpointClassifier::from_config(&config.endpoints)?;
        let authorizer = RoleAuthorizer::from_config(&config.authorization, &roles)?;
        Ok(Self::new(classifier, authorizer, roles)?)
    }

    pub fn classify(&self, method: &str, path: &str) -> EndpointCategory {
        self.classifier.classify(method, path)
    }

    pub fn authorize(&self, category: EndpointCategory, roles: &RoleSet) -> bool {
        self.authorizer.authorize(category, roles)
    }

    /// Classify then authorize one request
    pub fn decide(&self, method: &str, path: &str, roles: &RoleSet) -> Decision {
        let classification = self.classifier.classify_detailed(method, path);
        let access = self.authorizer.check(classification.category, roles);

        debug!(
            method,
            path,
            category = %classification.category,
            rule = ?classification.rule.map(|(_, source)| source),
            allowed = access.is_allowed(),
            "Evaluated request"
        );

        Decision {
            category: classification.category,
            access,
        }
    }

    /// Evaluate a request whose roles arrive as a raw header value
    ///
    /// A missing header is treated as an empty role set.
    pub fn decide_header(&self, method: &str, path: &str, roles_header: Option<&str>) -> Decision {
        let roles = self.parse_roles(roles_header.unwrap_or_default());
        self.decide(method, path, &roles)
    }

    /// Parse a roles header with this policy's normalization and aliases
    pub fn parse_roles(&self, header: &str) -> RoleSet {
        self.roles.parse_header(header)
    }

    /// Like [`decide`](Self::decide), as a `Result`
    pub fn require(
        &self,
        method: &str,
        path: &str,
        roles: &RoleSet,
    ) -> Result<EndpointCategory, AccessDeniedError> {
        let decision = self.decide(method, path, roles);
        match decision.access {
            AccessDecision::Allowed => Ok(decision.category),
            AccessDecision::Denied(reason) => {
                Err(AccessDeniedError::new(decision.category, reason))
            }
        }
    }

    pub fn classifier(&self) -> &EndpointClassifier {
        &self.classifier
    }

    pub fn authorizer(&self) -> &RoleAuthorizer {
        &self.authorizer
    }

    /// Serializable overview of the rule tables
    pub fn summary(&self) -> PolicySummary {
        let categories = EndpointCategory::all()
            .iter()
            .filter(|c| !c.is_public())
            .map(|&category| CategorySummary {
                category,
                endpoint_rules: self
                    .classifier
                    .rules()
                    .iter()
                    .filter(|r| r.category() == category)
                    .count(),
                roles: self
                    .authorizer
                    .permitted_roles(category)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect();

        PolicySummary {
            endpoint_rules: self.classifier.len(),
            authorization_rules: self.authorizer.len(),
            categories,
        }
    }
}

/// Overview of a policy's rule tables
#[derive(Debug, Clone, Serialize)]
pub struct PolicySummary {
    pub endpoint_rules: usize,
    pub authorization_rules: usize,
    pub categories: Vec<CategorySummary>,
}

/// Per-category part of [`PolicySummary`]
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: EndpointCategory,
    pub endpoint_rules: usize,
    pub roles: Vec<String>,
}
