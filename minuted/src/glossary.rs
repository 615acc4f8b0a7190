//! Process-wide glossary cache.
//!
//! Glossary terms only influence prompt hints, so a stale read is acceptable;
//! the cache trades freshness for not rescanning the table on every report.
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::model::GlossaryTerm;
use crate::{Error, GlossaryStore};

/// How long a scan result is served before the table is consulted again.
const CACHE_TTL: Duration = Duration::from_secs(600);

struct CacheEntry {
    fetched_at: Instant,
    terms: Arc<Vec<GlossaryTerm>>,
}

/// TTL cache in front of the glossary table scan.
pub struct GlossaryCache {
    ttl: Duration,
    inner: Mutex<Option<CacheEntry>>,
}

impl Default for GlossaryCache {
    fn default() -> Self {
        GlossaryCache::new()
    }
}

impl GlossaryCache {
    /// Cache with the standard ten minute TTL.
    pub fn new() -> Self {
        GlossaryCache::with_ttl(CACHE_TTL)
    }

    /// Cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        GlossaryCache {
            ttl,
            inner: Mutex::new(None),
        }
    }

    /// Return the cached terms, scanning the table on a miss or expiry. A
    /// poisoned lock is treated as a miss.
    pub async fn terms(
        &self,
        store: &Arc<dyn GlossaryStore + Send + Sync>,
    ) -> Result<Arc<Vec<GlossaryTerm>>, Error> {
        if let Ok(guard) = self.inner.lock() {
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&entry.terms));
                }
            }
        }

        let terms = Arc::new(store.scan_terms().await?);

        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(CacheEntry {
                fetched_at: Instant::now(),
                terms: Arc::clone(&terms),
            });
        }

        Ok(terms)
    }
}
