//! Per-host cache of live screen sessions

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window of a host's session listing
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(5000);

/// Session listing captured for one host
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// When the listing was captured
    pub captured_at: Instant,
    /// Live session names
    pub sessions: Arc<BTreeSet<String>>,
}

/// What sessions exist on each host, as of the last query.
///
/// Single-server and whole-host queries read and refresh the same entries.
/// Entries are never evicted; a stale entry is simply not served.
pub struct ScreenSessionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ScreenSessionCache {
    /// Create an empty cache with the given freshness window
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Freshness window
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sessions on `host` if captured less than one TTL ago
    pub fn fresh(&self, host: &str) -> Option<Arc<BTreeSet<String>>> {
        let entry = self.entries.get(host)?;
        if entry.captured_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.sessions))
        } else {
            tracing::trace!("Session cache for {} is stale", host);
            None
        }
    }

    /// Replace the entry for `host` with a listing captured now
    pub fn store(&self, host: &str, sessions: BTreeSet<String>) -> Arc<BTreeSet<String>> {
        let sessions = Arc::new(sessions);
        self.entries.insert(
            host.to_string(),
            CacheEntry {
                captured_at: Instant::now(),
                sessions: Arc::clone(&sessions),
            },
        );
        sessions
    }

    /// Raw entry for `host`, stale or not
    pub fn entry(&self, host: &str) -> Option<CacheEntry> {
        self.entries.get(host).map(|e| e.clone())
    }

    /// Number of hosts with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no host has been queried yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ScreenSessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
