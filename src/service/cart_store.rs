use crate::domain::cart::{Cart, CartError, CartLine, CartTotals, LineKey, ShippingPolicy};
use crate::domain::catalog::Product;
use crate::domain::checkout::CheckoutItem;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

#[async_trait::async_trait]
pub trait CartStorage: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;

    async fn save(&self, snapshot: &str) -> Result<()>;
}

/// Snapshot kept as one JSON document on disk.
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CartStorage for FileCartStorage {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading cart snapshot {}", self.path.display())),
        }
    }

    async fn save(&self, snapshot: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, snapshot)
            .await
            .with_context(|| format!("writing cart snapshot {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing cart snapshot {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCartStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryCartStorage {
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot.into())),
        }
    }
}

#[async_trait::async_trait]
impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, snapshot: &str) -> Result<()> {
        *self.slot.lock().await = Some(snapshot.to_string());
        Ok(())
    }
}

/// What subscribers see after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub totals: CartTotals,
}

impl CartView {
    fn of(cart: &Cart, policy: &ShippingPolicy) -> Self {
        Self {
            lines: cart.lines.clone(),
            item_count: cart.item_count(),
            totals: cart.totals(policy),
        }
    }
}

/// Cart state that is written through to storage and broadcast on every change.
pub struct CartStore {
    cart: RwLock<Cart>,
    storage: Arc<dyn CartStorage>,
    policy: ShippingPolicy,
    tx: watch::Sender<CartView>,
}

impl CartStore {
    pub async fn open(storage: Arc<dyn CartStorage>, policy: ShippingPolicy) -> Self {
        let cart = match storage.load().await {
            Ok(Some(raw)) => match serde_json::from_str::<Cart>(&raw) {
                Ok(cart) => cart,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable cart snapshot");
                    Cart::default()
                }
            },
            Ok(None) => Cart::default(),
            Err(e) => {
                tracing::warn!(error = %e, "cart storage unavailable; starting empty");
                Cart::default()
            }
        };
        let (tx, _) = watch::channel(CartView::of(&cart, &policy));
        Self {
            cart: RwLock::new(cart),
            storage,
            policy,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.tx.subscribe()
    }

    pub async fn view(&self) -> CartView {
        CartView::of(&*self.cart.read().await, &self.policy)
    }

    pub async fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.cart.read().await.checkout_items()
    }

    pub async fn add(
        &self,
        product: Product,
        size: &str,
        quantity: u32,
        custom_name: Option<&str>,
    ) -> Result<CartView, CartError> {
        self.mutate(|cart| cart.add(product, size, quantity, custom_name)).await
    }

    pub async fn update_quantity(&self, key: &LineKey, quantity: i64) -> Result<CartView, CartError> {
        self.mutate(|cart| cart.update_quantity(key, quantity)).await
    }

    pub async fn remove(&self, key: &LineKey) -> Result<CartView, CartError> {
        self.mutate(|cart| cart.remove(key)).await
    }

    pub async fn clear(&self) -> CartView {
        match self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
        .await
        {
            Ok(view) => view,
            Err(_) => self.view().await,
        }
    }

    async fn mutate<F>(&self, f: F) -> Result<CartView, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError>,
    {
        let mut cart = self.cart.write().await;
        f(&mut *cart)?;

        match serde_json::to_string(&*cart) {
            Ok(raw) => {
                if let Err(e) = self.storage.save(&raw).await {
                    tracing::warn!(error = %e, "cart snapshot not persisted");
                }
            }
            Err(e) => tracing::warn!(error = %e, "cart snapshot not serializable"),
        }

        let view = CartView::of(&*cart, &self.policy);
        self.tx.send_replace(view.clone());
        Ok(view)
    }
}
