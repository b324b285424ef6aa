use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront_payments::config::AppConfig;
use storefront_payments::gateways::mock::MockGateway;
use storefront_payments::gateways::razorpay::RazorpayGateway;
use storefront_payments::gateways::PaymentGateway;
use storefront_payments::idempotency::memory::MemoryIdempotencyStore;
use storefront_payments::idempotency::store_redis::RedisIdempotencyStore;
use storefront_payments::idempotency::IdempotencyStore;
use storefront_payments::repo::catalog_repo::CatalogRepo;
use storefront_payments::repo::ledger_repo::LedgerRepo;
use storefront_payments::repo::memory::MemoryStore;
use storefront_payments::repo::orders_repo::OrdersRepo;
use storefront_payments::repo::payment_logs_repo::PaymentLogsRepo;
use storefront_payments::{AppState, Backends};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let gateway: Arc<dyn PaymentGateway> = match (&cfg.razorpay_key_id, &cfg.razorpay_key_secret) {
        (Some(key_id), Some(key_secret)) => Arc::new(RazorpayGateway {
            base_url: cfg.razorpay_base_url.clone(),
            key_id: key_id.clone(),
            key_secret: key_secret.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: reqwest::Client::new(),
        }),
        _ => {
            tracing::warn!("RAZORPAY_KEY_ID/RAZORPAY_KEY_SECRET not set; using mock gateway");
            Arc::new(MockGateway::new(
                cfg.razorpay_key_secret.clone().unwrap_or_default(),
                std::env::var("MOCK_GATEWAY_BEHAVIOR").unwrap_or_default(),
            ))
        }
    };

    let mut backends = match &cfg.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Backends {
                orders: Arc::new(OrdersRepo { pool: pool.clone() }),
                payment_logs: Arc::new(PaymentLogsRepo { pool: pool.clone() }),
                ledger: Arc::new(LedgerRepo { pool: pool.clone() }),
                catalog: Arc::new(CatalogRepo { pool }),
                idempotency: Arc::new(MemoryIdempotencyStore::default()),
                gateway,
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; orders are kept in memory only");
            Backends::memory(Arc::new(MemoryStore::new()), gateway)
        }
    };

    match &cfg.redis_url {
        Some(url) => {
            let store = RedisIdempotencyStore::new(redis::Client::open(url.as_str())?, cfg.idempotency_ttl_secs);
            if let Err(e) = store.ping().await {
                tracing::warn!(error = %e, "redis not reachable yet; webhook claims will fail until it is");
            }
            backends.idempotency = Arc::new(store);
        }
        None => tracing::warn!("REDIS_URL not set; webhook de-duplication is process-local"),
    }

    if cfg.razorpay_webhook_secret.is_none() {
        tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set; webhooks will be rejected");
    }

    tracing::info!(
        storage = backends.ledger.backend(),
        idempotency = backends.idempotency.backend(),
        gateway = backends.gateway.name(),
        "backends selected"
    );

    let state = AppState::new(&cfg, backends);
    let app = storefront_payments::http::routes::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
