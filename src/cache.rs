// src/cache.rs
// Query freshness registry shared by the calendar, chat and recipe views

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use tracing::debug;

/// Identity of one cached server query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Recipes,
    Recipe(i64),
    WeekPlan(NaiveDate),
    ChatMessages(i64),
}

/// A set of queries to mark stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Recipe list and every recipe detail
    Recipes,
    /// Every week plan query
    WeekPlans,
    WeekPlan(NaiveDate),
    ChatMessages(i64),
}

impl Invalidation {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match (self, key) {
            (Invalidation::Recipes, QueryKey::Recipes | QueryKey::Recipe(_)) => true,
            (Invalidation::WeekPlans, QueryKey::WeekPlan(_)) => true,
            (Invalidation::WeekPlan(a), QueryKey::WeekPlan(b)) => a == b,
            (Invalidation::ChatMessages(a), QueryKey::ChatMessages(b)) => a == b,
            _ => false,
        }
    }
}

/// Tracks which queries hold current data. A key that is not fresh must be
/// refetched before use.
#[derive(Debug, Default)]
pub struct QueryCache {
    fresh: Mutex<HashSet<QueryKey>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_fresh(&self, key: QueryKey) {
        self.lock().insert(key);
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock().contains(key)
    }

    /// Mark every matching key stale; returns how many were fresh
    pub fn invalidate(&self, scope: Invalidation) -> usize {
        let mut fresh = self.lock();
        let before = fresh.len();
        fresh.retain(|key| !scope.matches(key));
        let removed = before - fresh.len();
        debug!(?scope, removed, "Invalidated queries");
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<QueryKey>> {
        self.fresh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
