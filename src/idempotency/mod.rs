use anyhow::Result;

pub mod memory;
pub mod store_redis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Caller owns the key and must `complete` or `release` it.
    Acquired,
    AlreadyProcessed,
    InFlight,
}

/// Shared record of webhook events that have been (or are being) applied.
#[async_trait::async_trait]
pub trait IdempotencyStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn claim(&self, key: &str) -> Result<Claim>;

    async fn complete(&self, key: &str) -> Result<()>;

    async fn release(&self, key: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
