use std::sync::Arc;

use shared::{
    domain::ProductId,
    error::UserNotice,
    protocol::CartLine,
};
use storage::{read_json, write_json, KeyValueStore};
use tracing::info;

use crate::{
    accounts::Accounts,
    catalog::CatalogGate,
    error::CartError,
    events::{EventBus, StoreEvent},
};

pub const CART_KEY: &str = "cart";
pub const TAX_RATE: f64 = 0.10;
pub const FREE_SHIPPING_ABOVE: f64 = 100.0;
pub const FLAT_SHIPPING: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
}

impl CartSummary {
    fn from_lines(lines: Vec<CartLine>) -> Self {
        if lines.is_empty() {
            return Self {
                lines,
                subtotal: 0.0,
                tax: 0.0,
                shipping: 0.0,
                total: 0.0,
            };
        }

        let subtotal: f64 = lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal * TAX_RATE;
        let shipping = if subtotal > FREE_SHIPPING_ABOVE {
            0.0
        } else {
            FLAT_SHIPPING
        };
        Self {
            lines,
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn shipping_label(&self) -> String {
        if self.shipping == 0.0 {
            "FREE".to_string()
        } else {
            format!("{:.2}", self.shipping)
        }
    }
}

/// Where checkout continues once the cart and login checks pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Payment,
}

/// Shopping cart persisted in local storage.
pub struct Cart {
    local: Arc<dyn KeyValueStore>,
    events: EventBus,
}

impl Cart {
    pub fn new(local: Arc<dyn KeyValueStore>, events: EventBus) -> Self {
        Self { local, events }
    }

    pub async fn lines(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(read_json(self.local.as_ref(), CART_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn add(&self, catalog: &CatalogGate, id: ProductId) -> Result<CartLine, CartError> {
        catalog.ensure_loaded().await;
        let product = catalog
            .product_by_id(id)
            .ok_or(CartError::ProductNotFound(id))?;

        let mut lines = self.lines().await?;
        let line = match lines.iter_mut().find(|line| line.id() == id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(1);
                existing.clone()
            }
            None => {
                let line = CartLine {
                    product: product.clone(),
                    quantity: 1,
                };
                lines.push(line.clone());
                line
            }
        };
        self.save(&lines).await?;

        info!(product_id = id.0, quantity = line.quantity, "cart: product added");
        let _ = self.events.send(StoreEvent::Notice(UserNotice::success(format!(
            "{} added to cart!",
            product.name
        ))));
        Ok(line)
    }

    pub async fn remove(&self, id: ProductId) -> Result<(), CartError> {
        let mut lines = self.lines().await?;
        lines.retain(|line| line.id() != id);
        self.save(&lines).await?;
        info!(product_id = id.0, "cart: product removed");
        Ok(())
    }

    /// Sets the quantity of an existing line; zero or less removes it.
    /// Returns `false` when the product is not in the cart.
    pub async fn update_quantity(&self, id: ProductId, quantity: i64) -> Result<bool, CartError> {
        let mut lines = self.lines().await?;
        let Some(pos) = lines.iter().position(|line| line.id() == id) else {
            return Ok(false);
        };

        if quantity <= 0 {
            lines.remove(pos);
        } else {
            lines[pos].quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.save(&lines).await?;
        Ok(true)
    }

    pub async fn item_count(&self) -> Result<u32, CartError> {
        Ok(total_quantity(&self.lines().await?))
    }

    pub async fn summary(&self) -> Result<CartSummary, CartError> {
        Ok(CartSummary::from_lines(self.lines().await?))
    }

    pub async fn checkout(&self, accounts: &Accounts) -> Result<CheckoutStep, CartError> {
        if self.lines().await?.is_empty() {
            return Err(CartError::EmptyCart);
        }
        if !accounts.is_logged_in().await? {
            return Err(CartError::LoginRequired);
        }
        Ok(CheckoutStep::Payment)
    }

    async fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        write_json(self.local.as_ref(), CART_KEY, lines).await?;
        let item_count = total_quantity(lines);
        let _ = self.events.send(StoreEvent::CartUpdated { item_count });
        Ok(())
    }
}

fn total_quantity(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .map(|line| line.quantity)
        .fold(0u32, u32::saturating_add)
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
