use crate::domain::catalog::{requires_custom_name, Product};
use crate::domain::checkout::CheckoutItem;
use serde::{Deserialize, Serialize};

/// Per-line ceiling; merges and updates past it are rejected.
pub const MAX_LINE_QUANTITY: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_above: f64,
    pub flat_fee: f64,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_above: 799.0,
            flat_fee: 75.0,
        }
    }
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: f64) -> f64 {
        if subtotal > self.free_above {
            0.0
        } else {
            self.flat_fee
        }
    }

    pub fn totals(&self, subtotal: f64) -> CartTotals {
        let shipping = self.shipping_for(subtotal);
        CartTotals {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub shipping: f64,
    pub total: f64,
}

/// Two lines are the same line iff product, size and custom name all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: String,
    pub size: String,
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Product,
    pub size: String,
    pub quantity: u32,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl CartLine {
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product.id.clone(),
            size: self.size.clone(),
            custom_name: self.custom_name.clone(),
        }
    }

    pub fn line_total(&self) -> f64 {
        self.product.price * self.quantity as f64
    }

    pub fn to_checkout_item(&self) -> CheckoutItem {
        CheckoutItem {
            product_id: self.product.id.clone(),
            title: self.product.title.clone(),
            price: self.product.price,
            quantity: self.quantity,
            size: self.size.clone(),
            image: self.product.primary_image().map(str::to_string),
            category: Some(self.product.category.clone()),
            custom_name: self.custom_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("please select a size")]
    SizeNotSelected,
    #[error("please enter a name for this {0}")]
    CustomNameRequired(String),
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("at most 99 of one item per order")]
    QuantityTooLarge,
    #[error("item not found in cart")]
    LineNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn add(
        &mut self,
        product: Product,
        size: &str,
        quantity: u32,
        custom_name: Option<&str>,
    ) -> Result<(), CartError> {
        let size = size.trim();
        if size.is_empty() {
            return Err(CartError::SizeNotSelected);
        }
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge);
        }
        let custom_name = custom_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if custom_name.is_none() && requires_custom_name(&product.category) {
            return Err(CartError::CustomNameRequired(product.category.clone()));
        }

        let key = LineKey {
            product_id: product.id.clone(),
            size: size.to_string(),
            custom_name: custom_name.clone(),
        };
        match self.lines.iter_mut().find(|l| l.key() == key) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .filter(|q| *q <= MAX_LINE_QUANTITY)
                    .ok_or(CartError::QuantityTooLarge)?;
            }
            None => self.lines.push(CartLine {
                product,
                size: key.size,
                quantity,
                custom_name,
            }),
        }
        Ok(())
    }

    /// A quantity of zero or below drops the line.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) -> Result<(), CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| &l.key() == key)
            .ok_or(CartError::LineNotFound)?;
        if quantity <= 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity = u32::try_from(quantity)
                .ok()
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or(CartError::QuantityTooLarge)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &LineKey) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key() != key);
        if self.lines.len() == before {
            return Err(CartError::LineNotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity))
    }

    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn totals(&self, policy: &ShippingPolicy) -> CartTotals {
        policy.totals(self.subtotal())
    }

    pub fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.lines.iter().map(CartLine::to_checkout_item).collect()
    }
}
