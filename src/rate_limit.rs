// Process-local sliding window rate governor, reset on restart

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::rate_key::RateKey;

pub const DEFAULT_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_MAX_KEYS: usize = 2000;

// Admitted timestamps (ms since epoch) for one key inside its trailing window
#[derive(Debug)]
pub struct RateEntry {
    hits: VecDeque<i64>,
    window_ms: u64, // window used by the last check, needed when sweeping
    inserted: u64,  // insertion sequence for coarse oldest-first eviction
}

impl RateEntry {
    fn new(inserted: u64, window_ms: u64) -> Self {
        Self {
            hits: VecDeque::new(),
            window_ms,
            inserted,
        }
    }

    // keep only timestamps strictly newer than now - window
    fn prune(&mut self, now_ms: i64, window_ms: u64) {
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);
        let cutoff = now_ms.saturating_sub(window);
        self.hits.retain(|&t| t > cutoff);
    }
}

// Keyed sliding window counter shared by all handlers. The map's shard lock
// serializes checks on one key.
#[derive(Debug)]
pub struct RateGovernor {
    entries: DashMap<String, RateEntry>,
    max_keys: usize,
    next_seq: AtomicU64,
    sweeping: AtomicBool,
}

impl RateGovernor {
    pub fn new(max_keys: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_keys: max_keys.max(1),
            next_seq: AtomicU64::new(0),
            sweeping: AtomicBool::new(false),
        }
    }

    /// Admit one unit of work for `key` at the current wall-clock time.
    pub fn admit(&self, key: &RateKey, limit: u32, window_ms: u64) -> bool {
        self.admit_at(key, limit, window_ms, chrono::Utc::now().timestamp_millis())
    }

    /// Same decision as [`admit`](Self::admit) against an explicit clock reading.
    pub fn admit_at(&self, key: &RateKey, limit: u32, window_ms: u64, now_ms: i64) -> bool {
        let limit = limit.max(1) as usize;
        let window_ms = window_ms.max(1);

        let admitted = {
            let mut entry = self
                .entries
                .entry(key.as_str().to_owned())
                .or_insert_with(|| {
                    RateEntry::new(self.next_seq.fetch_add(1, Ordering::Relaxed), window_ms)
                });

            entry.window_ms = window_ms;
            entry.prune(now_ms, window_ms);

            if entry.hits.len() < limit {
                entry.hits.push_back(now_ms);
                true
            } else {
                false
            }
        };

        // entry guard must be released before sweeping the map
        if self.entries.len() > self.max_keys {
            self.evict(now_ms);
        }

        admitted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    // Only runs once the ceiling is exceeded. Expired keys go first, then the
    // oldest ~20% by insertion order. One sweeper at a time.
    fn evict(&self, now_ms: i64) {
        if self.sweeping.swap(true, Ordering::Acquire) {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let window_ms = entry.window_ms;
            entry.prune(now_ms, window_ms);
            !entry.hits.is_empty()
        });

        let len = self.entries.len();
        if len > self.max_keys {
            let drop_count = (len / 5).max(len - self.max_keys);
            let mut seqs: Vec<u64> = self.entries.iter().map(|e| e.inserted).collect();
            if drop_count < seqs.len() {
                let (_, cutoff, _) = seqs.select_nth_unstable(drop_count - 1);
                let cutoff = *cutoff;
                self.entries.retain(|_, entry| entry.inserted > cutoff);
            } else {
                self.entries.clear();
            }
        }

        tracing::debug!(
            before,
            after = self.entries.len(),
            ceiling = self.max_keys,
            "rate governor evicted keys"
        );
        self.sweeping.store(false, Ordering::Release);
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEYS)
    }
}
