//! Bounded side-by-side comparison selection.

use shared::domain::{Product, ProductId};
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    catalog::CatalogGate,
    error::CompareError,
    events::{event_bus, EventBus, SelectionChanged, StoreEvent},
    listing::price_label,
};

pub const COMPARE_CAPACITY: usize = 3;

/// Floating badge shown while anything is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareIndicator {
    pub count: usize,
    pub capacity: usize,
    pub visible: bool,
}

impl CompareIndicator {
    pub fn label(&self) -> String {
        format!("Compare ({}/{})", self.count, self.capacity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparedProduct {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub price: String,
    pub old_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub products: Vec<ComparedProduct>,
    pub rows: Vec<ComparisonRow>,
}

pub struct ComparisonSelector {
    selected: Vec<ProductId>,
    events: EventBus,
}

impl Default for ComparisonSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonSelector {
    pub fn new() -> Self {
        Self::with_event_bus(event_bus())
    }

    pub fn with_event_bus(events: EventBus) -> Self {
        Self {
            selected: Vec::with_capacity(COMPARE_CAPACITY),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Applies a checkbox change. A rejected add leaves the selection untouched
    /// and the caller is expected to uncheck the box again.
    pub fn toggle(&mut self, id: ProductId, checked: bool) -> Result<(), CompareError> {
        if checked {
            if !self.selected.contains(&id) {
                if self.selected.len() >= COMPARE_CAPACITY {
                    return Err(CompareError::CapacityExceeded {
                        capacity: COMPARE_CAPACITY,
                    });
                }
                self.selected.push(id);
                info!(product_id = id.0, "compare: product added");
            }
        } else if let Some(pos) = self.selected.iter().position(|selected| *selected == id) {
            self.selected.remove(pos);
            info!(product_id = id.0, "compare: product removed");
        }

        self.notify();
        Ok(())
    }

    pub fn remove(&mut self, id: ProductId) {
        // unchecking never fails
        let _ = self.toggle(id, false);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        info!("compare: selection cleared");
        self.notify();
    }

    pub fn current_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected(&self) -> &[ProductId] {
        &self.selected
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.selected.contains(&id)
    }

    pub fn indicator(&self) -> CompareIndicator {
        CompareIndicator {
            count: self.selected.len(),
            capacity: COMPARE_CAPACITY,
            visible: !self.selected.is_empty(),
        }
    }

    /// Selected products in selection order. Ids the catalog does not know are
    /// skipped.
    pub fn resolve<'a>(&self, catalog: &'a CatalogGate) -> Vec<&'a Product> {
        self.selected
            .iter()
            .filter_map(|id| catalog.product_by_id(*id))
            .collect()
    }

    pub fn comparison_table(&self, catalog: &CatalogGate) -> Result<ComparisonTable, CompareError> {
        if self.selected.is_empty() {
            return Err(CompareError::NothingSelected);
        }

        let products = self.resolve(catalog);
        let row = |label: &'static str, value: fn(&Product) -> String| ComparisonRow {
            label,
            values: products.iter().map(|p| value(p)).collect(),
        };

        let rows = vec![
            row("Category", |p| {
                p.category.clone().unwrap_or_else(|| "N/A".to_string())
            }),
            row("Price", |p| price_label(p.price)),
            row("Specifications", |p| match &p.specs {
                Some(specs) => specs.join("\n"),
                None => "No specifications available".to_string(),
            }),
            row("Best Seller", |p| {
                String::from(if p.best_seller { "Yes" } else { "No" })
            }),
        ];

        let products = products
            .iter()
            .map(|p| ComparedProduct {
                id: p.id,
                name: p.name.clone(),
                image: p.image.clone(),
                price: price_label(p.price),
                old_price: p.old_price.map(price_label),
            })
            .collect();

        Ok(ComparisonTable { products, rows })
    }

    fn notify(&self) {
        let _ = self
            .events
            .send(StoreEvent::SelectionChanged(SelectionChanged {
                count: self.selected.len(),
                selected: self.selected.clone(),
            }));
    }
}

#[cfg(test)]
#[path = "tests/compare_tests.rs"]
mod tests;
