//! Decision metrics
//!
//! Thread-safe counters for forward-auth decisions, served as JSON from
//! `/api/metrics`.

use crate::access_control::{AccessDecision, Decision, EndpointCategory};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};

/// Decision metrics collector
pub struct DecisionMetrics {
    /// Server start time
    start_time: Instant,
    /// Server start time as SystemTime (for display)
    start_system_time: SystemTime,
    total_requests: AtomicU64,
    total_allowed: AtomicU64,
    total_denied: AtomicU64,
    /// Requests rejected before evaluation (malformed forward-auth input)
    total_rejected: AtomicU64,
    data: RwLock<MetricsData>,
    max_recent_decisions: usize,
}

#[derive(Default)]
struct CategoryStatsInner {
    allowed: u64,
    denied: u64,
}

#[derive(Default)]
struct MetricsData {
    category_stats: HashMap<EndpointCategory, CategoryStatsInner>,
    recent_decisions: VecDeque<DecisionRecord>,
}

/// Record of a recent decision
#[derive(Clone, Serialize)]
pub struct DecisionRecord {
    pub method: String,
    pub path: String,
    pub category: EndpointCategory,
    pub allowed: bool,
    /// Timestamp (seconds since the Unix epoch)
    pub timestamp: u64,
    /// Denial reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Serializable category statistics for API
#[derive(Clone, Serialize)]
pub struct CategoryStats {
    pub category: EndpointCategory,
    pub allowed: u64,
    pub denied: u64,
}

/// Overall metrics snapshot for API
#[derive(Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub start_time: u64,
    pub total_requests: u64,
    pub total_allowed: u64,
    pub total_denied: u64,
    pub total_rejected: u64,
    pub requests_per_minute: f64,
    pub categories: Vec<CategoryStats>,
    pub recent_decisions: Vec<DecisionRecord>,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a collector keeping `max_recent_decisions` recent decisions
    pub fn with_capacity(max_recent_decisions: usize) -> Self {
        Self {
            start_time: Instant::now(),
            start_system_time: SystemTime::now(),
            total_requests: AtomicU64::new(0),
            total_allowed: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            data: RwLock::new(MetricsData {
                category_stats: HashMap::new(),
                recent_decisions: VecDeque::with_capacity(max_recent_decisions),
            }),
            max_recent_decisions,
        }
    }

    // Poisoned locks are recovered: the counters stay usable after a panic
    // elsewhere.

    fn write_data(&self) -> RwLockWriteGuard<'_, MetricsData> {
        self.data.write().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_data(&self) -> RwLockReadGuard<'_, MetricsData> {
        self.data.read().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record an evaluated request
    pub fn record(&self, method: &str, path: &str, decision: &Decision) {
        let allowed = decision.is_allowed();
        let timestamp = unix_secs(SystemTime::now());

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_denied.fetch_add(1, Ordering::Relaxed);
        }

        let mut data = self.write_data();

        let entry = data.category_stats.entry(decision.category).or_default();
        if allowed {
            entry.allowed += 1;
        } else {
            entry.denied += 1;
        }

        if self.max_recent_decisions == 0 {
            return;
        }
        if data.recent_decisions.len() >= self.max_recent_decisions {
            data.recent_decisions.pop_front();
        }
        data.recent_decisions.push_back(DecisionRecord {
            method: method.to_string(),
            path: path.to_string(),
            category: decision.category,
            allowed,
            timestamp,
            reason: match &decision.access {
                AccessDecision::Denied(reason) => Some(reason.clone()),
                AccessDecision::Allowed => None,
            },
        });
    }

    /// Record a request that could not be evaluated
    pub fn record_rejected(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime_secs = self.start_time.elapsed().as_secs();
        let total_requests = self.total_requests.load(Ordering::Relaxed);

        let requests_per_minute = if uptime_secs > 0 {
            (total_requests as f64 / uptime_secs as f64) * 60.0
        } else {
            0.0
        };

        let data = self.read_data();

        let mut categories: Vec<CategoryStats> = data
            .category_stats
            .iter()
            .map(|(category, s)| CategoryStats {
                category: *category,
                allowed: s.allowed,
                denied: s.denied,
            })
            .collect();
        categories.sort_unstable_by(|a, b| {
            (b.allowed + b.denied)
                .cmp(&(a.allowed + a.denied))
                .then(a.category.cmp(&b.category))
        });

        let recent_decisions: Vec<_> = data.recent_decisions.iter().cloned().collect();

        drop(data);

        MetricsSnapshot {
            uptime_secs,
            start_time: unix_secs(self.start_system_time),
            total_requests,
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            requests_per_minute,
            categories,
            recent_decisions,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_denied(&self) -> u64 {
        self.total_denied.load(Ordering::Relaxed)
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
