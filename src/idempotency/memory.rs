use crate::idempotency::{Claim, IdempotencyStore};
use anyhow::Result;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_RETAIN: usize = 500;

#[derive(Default)]
struct Inner {
    in_flight: HashSet<String>,
    processed: HashSet<String>,
    order: VecDeque<String>,
}

/// Single-process fallback. Completed keys are bounded: past `capacity`
/// only the most recent `retain` survive, and nothing survives a restart.
pub struct MemoryIdempotencyStore {
    inner: Mutex<Inner>,
    capacity: usize,
    retain: usize,
}

impl Default for MemoryIdempotencyStore {
    fn default() -> Self {
        Self::with_bounds(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}

impl MemoryIdempotencyStore {
    pub fn with_bounds(capacity: usize, retain: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            retain: retain.min(capacity),
        }
    }

    pub async fn processed_len(&self) -> usize {
        self.inner.lock().await.processed.len()
    }
}

#[async_trait::async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn claim(&self, key: &str) -> Result<Claim> {
        let mut inner = self.inner.lock().await;
        if inner.processed.contains(key) {
            return Ok(Claim::AlreadyProcessed);
        }
        if !inner.in_flight.insert(key.to_string()) {
            return Ok(Claim::InFlight);
        }
        Ok(Claim::Acquired)
    }

    async fn complete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.in_flight.remove(key);
        if inner.processed.insert(key.to_string()) {
            inner.order.push_back(key.to_string());
        }
        if inner.order.len() > self.capacity {
            let drop = inner.order.len() - self.retain;
            for _ in 0..drop {
                if let Some(old) = inner.order.pop_front() {
                    inner.processed.remove(&old);
                }
            }
            tracing::debug!(retained = inner.order.len(), "trimmed webhook idempotency window");
        }
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.inner.lock().await.in_flight.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_claim_sees_completed_key() {
        let store = MemoryIdempotencyStore::default();
        assert_eq!(store.claim("k").await.unwrap(), Claim::Acquired);
        assert_eq!(store.claim("k").await.unwrap(), Claim::InFlight);
        store.complete("k").await.unwrap();
        assert_eq!(store.claim("k").await.unwrap(), Claim::AlreadyProcessed);
    }

    #[tokio::test]
    async fn released_key_can_be_claimed_again() {
        let store = MemoryIdempotencyStore::default();
        assert_eq!(store.claim("k").await.unwrap(), Claim::Acquired);
        store.release("k").await.unwrap();
        assert_eq!(store.claim("k").await.unwrap(), Claim::Acquired);
    }

    #[tokio::test]
    async fn trims_to_most_recent_when_over_capacity() {
        let store = MemoryIdempotencyStore::with_bounds(10, 5);
        for i in 0..11 {
            let key = format!("evt_{i}");
            store.claim(&key).await.unwrap();
            store.complete(&key).await.unwrap();
        }
        assert_eq!(store.processed_len().await, 5);
        assert_eq!(store.claim("evt_10").await.unwrap(), Claim::AlreadyProcessed);
        assert_eq!(store.claim("evt_0").await.unwrap(), Claim::Acquired);
    }
}
