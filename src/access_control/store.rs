//! Live policy store
//!
//! Holds the serving policy behind an [`ArcSwap`]. Each request loads one
//! snapshot and evaluates against it from start to finish, so a reload is
//! observed either entirely or not at all.

use crate::access_control::policy::{AccessPolicy, PolicySummary};
use crate::error::ConfigError;
use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

/// One generation of the serving policy
#[derive(Debug)]
pub struct PolicySnapshot {
    pub policy: AccessPolicy,
    /// Starts at 1 and increases on every successful swap
    pub generation: u64,
    /// Seconds since the Unix epoch
    pub loaded_at: u64,
}

impl PolicySnapshot {
    fn new(policy: AccessPolicy, generation: u64) -> Self {
        Self {
            policy,
            generation,
            loaded_at: unix_now(),
        }
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            generation: self.generation,
            loaded_at: self.loaded_at,
            policy: self.policy.summary(),
        }
    }
}

/// Serializable view of the serving snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub generation: u64,
    pub loaded_at: u64,
    #[serde(flatten)]
    pub policy: PolicySummary,
}

/// Atomically replaceable policy holder
pub struct PolicyStore {
    current: ArcSwap<PolicySnapshot>,
}

impl PolicyStore {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(PolicySnapshot::new(policy, 1)),
        }
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Install a new policy, returning its generation
    ///
    /// Concurrent replacements each get a distinct generation.
    pub fn replace(&self, policy: AccessPolicy) -> u64 {
        let previous = self.current.rcu(|current| {
            PolicySnapshot::new(policy.clone(), current.generation + 1)
        });
        previous.generation + 1
    }

    /// Build a policy with `build` and install it if that succeeds
    ///
    /// On failure the serving snapshot is left untouched.
    pub fn reload_from<F>(&self, build: F) -> Result<u64, ConfigError>
    where
        F: FnOnce() -> Result<AccessPolicy, ConfigError>,
    {
        match build() {
            Ok(policy) => {
                let generation = self.replace(policy);
                info!(generation, "Reloaded access policy");
                Ok(generation)
            }
            Err(e) => {
                error!(error = %e, generation = self.generation(), "Policy reload failed, keeping current policy");
                Err(e)
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
