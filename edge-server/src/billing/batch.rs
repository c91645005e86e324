//! 批量加菜去重
//!
//! 前端刷新会重复提交同一个 `batch_id`；TTL 内再次出现的批次直接丢弃。
//! 过期条目由后台任务定期清理。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

/// How long a batch id is remembered
pub const BATCH_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct BatchGuard {
    seen: DashMap<String, Instant>,
    ttl: Duration,
}

impl Default for BatchGuard {
    fn default() -> Self {
        Self::new(BATCH_TTL)
    }
}

impl BatchGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Record `batch_id`; false when it was already seen within the TTL
    pub fn check_and_mark(&self, batch_id: &str) -> bool {
        let now = Instant::now();
        match self.seen.entry(batch_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.ttl {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop a batch whose write failed so a retry is accepted
    pub fn forget(&self, batch_id: &str) {
        self.seen.remove(batch_id);
    }

    /// Remove expired ids, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.seen.len();
        let ttl = self.ttl;
        self.seen.retain(|_, seen_at| seen_at.elapsed() < ttl);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
