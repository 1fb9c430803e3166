//! Access control module
//!
//! Two-stage decision pipeline evaluated for every request NGINX forwards:
//!
//! 1. **Classification** - `METHOD:PATH` is matched against an ordered table
//!    of endpoint rules. The first matching rule's category wins; requests no
//!    rule matches are `public`.
//! 2. **Authorization** - the category and the caller's role set are matched
//!    against an ordered table of authorization rules. A rule permits the
//!    request when the caller holds any of its roles. `public` is always
//!    allowed; everything else defaults to deny.
//!
//! ## Example Configuration
//!
//! ```toml
//! [[endpoints]]
//! pattern = "~^GET:/fineract-provider/api/v1/tellers(/.*)?$"
//! category = "common-tellers"
//! examples = ["GET:/fineract-provider/api/v1/tellers"]
//!
//! [[authorization]]
//! category = "common-tellers"
//! roles = ["cashier", "branch-manager"]
//! ```

pub mod authorizer;
pub mod classifier;
pub mod patterns;
pub mod policy;
pub mod roles;
pub mod store;
pub mod types;

pub use authorizer::{AuthorizationRule, RoleAuthorizer};
pub use classifier::{Classification, EndpointClassifier, EndpointRule};
pub use patterns::{RequestPattern, normalize_path, request_key};
pub use policy::{AccessPolicy, CategorySummary, Decision, PolicySummary};
pub use roles::{RoleNormalizer, RoleSet};
pub use store::{PolicySnapshot, PolicyStore, SnapshotSummary};
pub use types::{AccessDecision, EndpointCategory};
