use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{Catalog, Product, ProductId};

use crate::{
    catalog::{CatalogGate, CatalogSource},
    error::CatalogFetchError,
};

pub struct StaticSource(pub Result<Catalog, CatalogFetchError>);

#[async_trait]
impl CatalogSource for StaticSource {
    async fn fetch(&self) -> Result<Catalog, CatalogFetchError> {
        self.0.clone()
    }
}

pub fn product(id: i64, name: &str, price: f64) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        price,
        old_price: None,
        category: None,
        best_seller: false,
        specs: None,
        image: format!("img/{id}.png"),
        description: None,
    }
}

pub fn laptop(id: i64, name: &str, price: f64, best_seller: bool) -> Product {
    Product {
        category: Some("laptops".to_string()),
        best_seller,
        specs: Some(vec![format!("{name} CPU"), "16GB RAM".to_string()]),
        ..product(id, name, price)
    }
}

pub fn accessory(id: i64, name: &str, price: f64, best_seller: bool) -> Product {
    Product {
        category: Some("accessories".to_string()),
        best_seller,
        ..product(id, name, price)
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog {
        laptops: vec![
            laptop(1, "Zephyrus G14", 6999.0, true),
            laptop(2, "aero 14", 4299.0, false),
            laptop(3, "MacBook Air", 4999.0, true),
            laptop(4, "ThinkPad X1", 7599.0, false),
        ],
        accessories: vec![
            accessory(10, "Wireless Mouse", 59.9, true),
            accessory(11, "USB-C Dock", 120.0, false),
            accessory(12, "Laptop Sleeve", 45.0, false),
        ],
    }
}

pub fn unloaded_gate() -> CatalogGate {
    CatalogGate::new(Arc::new(StaticSource(Ok(sample_catalog()))))
}

pub async fn ready_gate() -> CatalogGate {
    let gate = unloaded_gate();
    gate.ensure_loaded().await;
    gate
}

pub async fn failed_gate() -> CatalogGate {
    let gate = CatalogGate::new(Arc::new(StaticSource(Err(CatalogFetchError::Network(
        "offline".into(),
    )))));
    gate.ensure_loaded().await;
    gate
}
