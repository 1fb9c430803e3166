//! Access control types
//!
//! Core types shared by the classifier and the authorizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Endpoint category for authorization grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointCategory {
    AccountManager,
    Cashier,
    BranchManager,
    Admin,
    Accountant,
    CommonOffices,
    CommonCurrencies,
    CommonTellers,
    CommonClientsRead,
    CommonSavingsaccountsRead,
    CommonLoansRead,
    Public,
}

impl EndpointCategory {
    /// Get the category label as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::AccountManager => "account-manager",
            EndpointCategory::Cashier => "cashier",
            EndpointCategory::BranchManager => "branch-manager",
            EndpointCategory::Admin => "admin",
            EndpointCategory::Accountant => "accountant",
            EndpointCategory::CommonOffices => "common-offices",
            EndpointCategory::CommonCurrencies => "common-currencies",
            EndpointCategory::CommonTellers => "common-tellers",
            EndpointCategory::CommonClientsRead => "common-clients-read",
            EndpointCategory::CommonSavingsaccountsRead => "common-savingsaccounts-read",
            EndpointCategory::CommonLoansRead => "common-loans-read",
            EndpointCategory::Public => "public",
        }
    }

    /// Try to parse a category from its label
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "account-manager" => Some(EndpointCategory::AccountManager),
            "cashier" => Some(EndpointCategory::Cashier),
            "branch-manager" => Some(EndpointCategory::BranchManager),
            "admin" => Some(EndpointCategory::Admin),
            "accountant" => Some(EndpointCategory::Accountant),
            "common-offices" => Some(EndpointCategory::CommonOffices),
            "common-currencies" => Some(EndpointCategory::CommonCurrencies),
            "common-tellers" => Some(EndpointCategory::CommonTellers),
            "common-clients-read" => Some(EndpointCategory::CommonClientsRead),
            "common-savingsaccounts-read" => Some(EndpointCategory::CommonSavingsaccountsRead),
            "common-loans-read" => Some(EndpointCategory::CommonLoansRead),
            "public" => Some(EndpointCategory::Public),
            _ => None,
        }
    }

    /// Get all categories
    pub fn all() -> &'static [EndpointCategory] {
        &[
            EndpointCategory::AccountManager,
            EndpointCategory::Cashier,
            EndpointCategory::BranchManager,
            EndpointCategory::Admin,
            EndpointCategory::Accountant,
            EndpointCategory::CommonOffices,
            EndpointCategory::CommonCurrencies,
            EndpointCategory::CommonTellers,
            EndpointCategory::CommonClientsRead,
            EndpointCategory::CommonSavingsaccountsRead,
            EndpointCategory::CommonLoansRead,
            EndpointCategory::Public,
        ]
    }

    /// Whether this is the always-allowed category
    pub const fn is_public(&self) -> bool {
        matches!(self, EndpointCategory::Public)
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EndpointCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| format!("unknown endpoint category '{}'", s))
    }
}

/// Result of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access is allowed
    Allowed,
    /// Access is denied with a reason
    Denied(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in EndpointCategory::all() {
            let s = category.as_str();
            let parsed = EndpointCategory::try_parse(s).unwrap();
            assert_eq!(*category, parsed);
        }
    }

    #[test]
    fn test_category_serde_matches_label() {
        for category in EndpointCategory::all() {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn test_unknown_category() {
        assert!(EndpointCategory::try_parse("teller").is_none());
        assert!("Common-Offices".parse::<EndpointCategory>().is_err());
    }

    #[test]
    fn test_only_public_is_public() {
        let public: Vec<_> = EndpointCategory::all()
            .iter()
            .filter(|c| c.is_public())
            .collect();
        assert_eq!(public, vec![&EndpointCategory::Public]);
    }
}
