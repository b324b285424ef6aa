use crate::idempotency::{Claim, IdempotencyStore};
use anyhow::Result;
use redis::AsyncCommands;

const IN_FLIGHT: &str = "processing";
const DONE: &str = "done";

#[derive(Clone)]
pub struct RedisIdempotencyStore {
    pub client: redis::Client,
    pub ttl_secs: u64,
    pub claim_ttl_secs: u64,
}

impl RedisIdempotencyStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self {
            client,
            ttl_secs,
            claim_ttl_secs: 300,
        }
    }

    fn key(event_key: &str) -> String {
        format!("webhook:razorpay:event:{}", event_key)
    }
}

#[async_trait::async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn claim(&self, key: &str) -> Result<Claim> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = Self::key(key);
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(IN_FLIGHT)
            .arg("NX")
            .arg("EX")
            .arg(self.claim_ttl_secs)
            .query_async(&mut conn)
            .await?;
        if acquired.is_some() {
            return Ok(Claim::Acquired);
        }

        let current: Option<String> = conn.get(&redis_key).await?;
        Ok(match current.as_deref() {
            Some(DONE) => Claim::AlreadyProcessed,
            Some(_) => Claim::InFlight,
            // expired between SET and GET; treat as busy so the gateway retries
            None => Claim::InFlight,
        })
    }

    async fn complete(&self, key: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(key))
            .arg(DONE)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = conn.del(Self::key(key)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
