// Bounded in-memory ring of published dashboard snapshots (chart time series).

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::models::DashboardSnapshot;

pub struct SnapshotHistory {
    ring: RwLock<VecDeque<DashboardSnapshot>>,
    capacity: usize,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Appends, evicting the oldest entry once full. A snapshot whose generation is not newer
    /// than the latest one is rejected and `false` returned.
    pub async fn push(&self, snapshot: DashboardSnapshot) -> bool {
        self.push_then(snapshot, |_| {}).await
    }

    /// Like `push`, running `on_accept` while the ring is still locked, so callers that
    /// forward accepted snapshots (the broadcast) see them in generation order.
    pub async fn push_then<F>(&self, snapshot: DashboardSnapshot, on_accept: F) -> bool
    where
        F: FnOnce(&DashboardSnapshot),
    {
        let mut ring = self.ring.write().await;
        if let Some(latest) = ring.back()
            && snapshot.generation <= latest.generation
        {
            return false;
        }
        on_accept(&snapshot);
        while ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(snapshot);
        true
    }

    pub async fn latest(&self) -> Option<DashboardSnapshot> {
        self.ring.read().await.back().cloned()
    }

    /// Up to `limit` most recent snapshots, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<DashboardSnapshot> {
        let ring = self.ring.read().await;
        let skip = ring.len().saturating_sub(limit);
        ring.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.ring.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ring.read().await.is_empty()
    }
}
