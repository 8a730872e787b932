//! # Evaluation caches
//!
//! Two kinds of values are cached on an individual:
//!
//! - the worst-case value of every metric and the resulting feasibility flag,
//!   frozen together once the individual is fully evaluated;
//! - the normalized constraint violation, which depends on population-relative
//!   ranges and optional weights and is therefore keyed by a [`CacheToken`]
//!   naming the "view" (typically one sort call) it was computed for.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

use crate::problem::MetricValue;
use crate::rng::ThreadLocalRng;

static TOKEN_EPOCH: OnceLock<u64> = OnceLock::new();
static TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque key under which a constraint violation is cached.
///
/// Tokens are unique within a process, and the random per-process epoch keeps
/// tokens restored from a checkpoint written by another process from colliding
/// with freshly minted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheToken {
    epoch: u64,
    seq: u64,
}

impl CacheToken {
    /// Mints a token that has never been handed out before.
    pub fn fresh() -> Self {
        let epoch = *TOKEN_EPOCH.get_or_init(|| ThreadLocalRng::gen_range(0..u64::MAX));
        let seq = TOKEN_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        Self { epoch, seq }
    }
}

/// Worst-case metric values and feasibility of a fully evaluated individual.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FrozenEvaluation {
    pub(crate) worst_case: BTreeMap<String, MetricValue>,
    pub(crate) feasible: bool,
}

/// Constraint violations keyed by view.
///
/// Readers may fill it concurrently; recomputing an entry is idempotent.
#[derive(Debug, Default)]
pub(crate) struct ViolationCache {
    entries: Mutex<HashMap<CacheToken, f64>>,
}

impl ViolationCache {
    pub(crate) fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CacheToken, f64)>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub(crate) fn get(&self, token: CacheToken) -> Option<f64> {
        self.lock().get(&token).copied()
    }

    pub(crate) fn insert(&self, token: CacheToken, violation: f64) {
        self.lock().insert(token, violation);
    }

    pub(crate) fn clear(&mut self) {
        self.entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn entries(&self) -> Vec<(CacheToken, f64)> {
        self.lock().iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheToken, f64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for ViolationCache {
    fn clone(&self) -> Self {
        Self::from_entries(self.entries())
    }
}
