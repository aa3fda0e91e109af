//! Bounded pool of streaming-connection handles.
//!
//! Each entry is keyed by an operation id and owns a cancellation
//! scope for the stream it governs. Acquiring an id that is already
//! pooled returns the existing handle and refreshes its recency;
//! acquiring a new id at capacity first evicts the least recently used
//! entry. Every entry expires a fixed interval after creation (the TTL
//! is deliberately not refreshed on reuse, bounding worst-case
//! transport lifetime).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A reusable streaming-transport handle.
///
/// The handle itself is a cancellation scope: stream readers select on
/// [`StreamConnection::cancelled`] so that closing the handle (by
/// explicit release, capacity eviction, or idle expiry) aborts any
/// in-flight read. Closing is idempotent.
#[derive(Debug)]
pub struct StreamConnection {
    id: String,
    created_at: Instant,
    token: CancellationToken,
    closed: AtomicBool,
}

impl StreamConnection {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            token: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Operation id this handle is keyed by.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the handle was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Close the transport. Safe to call more than once; only the
    /// first call cancels the scope.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(id = %self.id, "closing pooled connection");
            self.token.cancel();
        }
    }

    /// Whether the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves when the handle is closed.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

struct PoolEntry {
    conn: Arc<StreamConnection>,
    last_used_at: Instant,
    expiry: JoinHandle<()>,
}

/// Bounded cache of [`StreamConnection`] handles keyed by operation id.
#[derive(Clone)]
pub struct ConnectionPool {
    entries: Arc<Mutex<IndexMap<String, PoolEntry>>>,
    capacity: usize,
    idle_ttl: Duration,
}

impl ConnectionPool {
    /// Create a pool with the given capacity and idle TTL.
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
            capacity,
            idle_ttl,
        }
    }

    /// Return the handle for `id`, creating it if absent.
    ///
    /// Reuse is idempotent: a second acquire with the same id returns
    /// the same handle and only refreshes its recency. A new entry at
    /// capacity evicts the entry with the oldest `last_used_at` first
    /// (ties broken by scan order).
    pub async fn acquire(&self, id: &str) -> Arc<StreamConnection> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(id) {
            entry.last_used_at = Instant::now();
            return Arc::clone(&entry.conn);
        }

        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .fold(None::<(String, Instant)>, |oldest, (key, entry)| match oldest {
                    Some((_, stamp)) if stamp <= entry.last_used_at => oldest,
                    _ => Some((key.clone(), entry.last_used_at)),
                });
            if let Some((key, _)) = oldest {
                debug!(id = %key, "evicting pooled connection at capacity");
                if let Some(entry) = entries.shift_remove(&key) {
                    entry.expiry.abort();
                    entry.conn.close();
                }
            }
        }

        let conn = Arc::new(StreamConnection::new(id.to_string()));
        let expiry = self.spawn_expiry(id.to_string());
        entries.insert(
            id.to_string(),
            PoolEntry {
                conn: Arc::clone(&conn),
                last_used_at: Instant::now(),
                expiry,
            },
        );
        conn
    }

    /// Schedule idle expiry for a new entry, measured from creation.
    fn spawn_expiry(&self, id: String) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let ttl = self.idle_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut map = entries.lock().await;
            if let Some(entry) = map.shift_remove(&id) {
                debug!(%id, "pooled connection expired");
                entry.conn.close();
            }
        })
    }

    /// Close and remove one entry if present, canceling its pending
    /// expiry.
    pub async fn release(&self, id: &str) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.shift_remove(id) {
            entry.expiry.abort();
            entry.conn.close();
        }
    }

    /// Close and remove every entry.
    pub async fn release_all(&self) {
        let mut entries = self.entries.lock().await;
        for (_, entry) in entries.drain(..) {
            entry.expiry.abort();
            entry.conn.close();
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether an entry for `id` is currently pooled.
    pub async fn contains(&self, id: &str) -> bool {
        self.entries.lock().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> ConnectionPool {
        ConnectionPool::new(capacity, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn acquire_is_idempotent_per_id() {
        let pool = pool(5);
        let first = pool.acquire("op-1").await;
        let second = pool.acquire("op-1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let pool = pool(3);
        let one = pool.acquire("1").await;
        pool.acquire("2").await;
        pool.acquire("3").await;
        pool.acquire("4").await;

        assert_eq!(pool.len().await, 3);
        assert!(!pool.contains("1").await);
        assert!(one.is_closed());
        assert!(pool.contains("4").await);
    }

    #[tokio::test]
    async fn reuse_protects_an_entry_from_eviction() {
        let pool = pool(2);
        pool.acquire("1").await;
        pool.acquire("2").await;
        // Touch "1" so "2" becomes the oldest.
        pool.acquire("1").await;
        pool.acquire("3").await;

        assert!(pool.contains("1").await);
        assert!(!pool.contains("2").await);
    }

    #[tokio::test]
    async fn release_closes_exactly_once() {
        let pool = pool(5);
        let conn = pool.acquire("op").await;
        pool.release("op").await;
        assert!(conn.is_closed());
        assert_eq!(pool.len().await, 0);

        // Double close is a no-op.
        conn.close();
        pool.release("op").await;
    }

    #[tokio::test]
    async fn release_all_drains_the_pool() {
        let pool = pool(5);
        let a = pool.acquire("a").await;
        let b = pool.acquire("b").await;
        pool.release_all().await;
        assert_eq!(pool.len().await, 0);
        assert!(a.is_closed());
        assert!(b.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_expire_after_the_ttl() {
        let pool = ConnectionPool::new(5, Duration::from_secs(30));
        let conn = pool.acquire("op").await;

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(!pool.contains("op").await);
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn reuse_does_not_extend_the_ttl() {
        let pool = ConnectionPool::new(5, Duration::from_secs(30));
        pool.acquire("op").await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        pool.acquire("op").await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        // 31s after creation the entry is gone even though it was
        // touched at 20s.
        assert!(!pool.contains("op").await);
    }

    #[tokio::test(start_paused = true)]
    async fn release_cancels_the_pending_expiry() {
        let pool = ConnectionPool::new(5, Duration::from_secs(30));
        pool.acquire("op").await;
        pool.release("op").await;

        // A fresh entry under the same id must not be removed by the
        // first entry's timer.
        pool.acquire("op").await;
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(pool.contains("op").await);
    }
}
