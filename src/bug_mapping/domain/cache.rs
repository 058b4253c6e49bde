//! Name-keyed lookups of locally known tests and jobs.

use super::{JobRef, TestRef};
use std::collections::HashMap;

/// Entries that can be looked up by name.
pub trait CacheEntry: Clone {
    /// Returns the lookup name.
    fn cache_name(&self) -> &str;
}

impl CacheEntry for TestRef {
    fn cache_name(&self) -> &str {
        self.name()
    }
}

impl CacheEntry for JobRef {
    fn cache_name(&self) -> &str {
        self.name()
    }
}

/// Read-only name lookup built once per reconciliation run.
#[derive(Debug, Clone)]
pub struct LookupCache<T> {
    entries: HashMap<String, T>,
}

/// Lookup of known tests by name.
pub type TestCache = LookupCache<TestRef>;

/// Lookup of known CI jobs by name.
pub type JobCache = LookupCache<JobRef>;

impl<T: CacheEntry> LookupCache<T> {
    /// Returns the entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for LookupCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: CacheEntry> FromIterator<T> for LookupCache<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|entry| (entry.cache_name().to_owned(), entry))
            .collect();
        Self { entries }
    }
}
