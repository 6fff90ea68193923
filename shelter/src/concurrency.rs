//! Coalescing of concurrent network fetches for the same key.
//!
//! When several clients miss on the same URL at once, only the first one
//! (the leader) goes to the network. The others await the leader's
//! response. If the leader gives up without a response, waiters receive
//! `None` and fetch on their own.

use std::future::Future;
use std::pin::Pin;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shelter_core::RequestKey;
use tokio::sync::broadcast;

/// Whether to fetch or to wait for a fetch already in flight.
pub enum ConcurrencyDecision<Res> {
    /// This caller leads; it must eventually call
    /// [`complete`](ConcurrencyManager::complete) or
    /// [`abandon`](ConcurrencyManager::abandon).
    Proceed,
    /// Another caller is fetching; the future resolves to its response, or
    /// `None` if it gave up.
    Await(Pin<Box<dyn Future<Output = Option<Res>> + Send>>),
}

/// Coordinates concurrent fetches to the same key.
pub trait ConcurrencyManager<Res>: Send + Sync {
    /// Registers interest in `key`.
    fn check(&self, key: &RequestKey) -> ConcurrencyDecision<Res>;

    /// Hands the leader's response to every waiter and returns it.
    fn complete(&self, key: &RequestKey, response: Res) -> Res;

    /// Releases waiters without a response.
    fn abandon(&self, key: &RequestKey);
}

/// Never coalesces; every caller fetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConcurrencyManager;

impl<Res> ConcurrencyManager<Res> for NoopConcurrencyManager
where
    Res: Send + 'static,
{
    fn check(&self, _key: &RequestKey) -> ConcurrencyDecision<Res> {
        ConcurrencyDecision::Proceed
    }

    fn complete(&self, _key: &RequestKey, response: Res) -> Res {
        response
    }

    fn abandon(&self, _key: &RequestKey) {}
}

/// Coalesces fetches through one broadcast channel per in-flight key.
#[derive(Debug)]
pub struct BroadcastConcurrencyManager<Res> {
    in_flight: DashMap<RequestKey, broadcast::Sender<Res>>,
}

impl<Res> BroadcastConcurrencyManager<Res> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<Res> Default for BroadcastConcurrencyManager<Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Res> ConcurrencyManager<Res> for BroadcastConcurrencyManager<Res>
where
    Res: Clone + Send + Sync + 'static,
{
    fn check(&self, key: &RequestKey) -> ConcurrencyDecision<Res> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let mut rx = entry.get().subscribe();
                ConcurrencyDecision::Await(Box::pin(async move { rx.recv().await.ok() }))
            }
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx);
                ConcurrencyDecision::Proceed
            }
        }
    }

    fn complete(&self, key: &RequestKey, response: Res) -> Res {
        if let Some((_, tx)) = self.in_flight.remove(key) {
            // No receivers is fine: nobody was waiting.
            let _ = tx.send(response.clone());
        }
        response
    }

    fn abandon(&self, key: &RequestKey) {
        self.in_flight.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RequestKey {
        RequestKey::get("/app.js")
    }

    #[tokio::test]
    async fn waiter_receives_leader_response() {
        let manager = BroadcastConcurrencyManager::<u32>::new();
        assert!(matches!(manager.check(&key()), ConcurrencyDecision::Proceed));
        let ConcurrencyDecision::Await(waiter) = manager.check(&key()) else {
            panic!("second caller should wait");
        };
        assert_eq!(manager.complete(&key(), 7), 7);
        assert_eq!(waiter.await, Some(7));
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn abandoned_waiters_get_none() {
        let manager = BroadcastConcurrencyManager::<u32>::new();
        let _ = manager.check(&key());
        let ConcurrencyDecision::Await(waiter) = manager.check(&key()) else {
            panic!("second caller should wait");
        };
        manager.abandon(&key());
        assert_eq!(waiter.await, None);
        assert!(matches!(manager.check(&key()), ConcurrencyDecision::Proceed));
    }
}
