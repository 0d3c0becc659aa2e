use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use client_core::{
    CartError, CatalogFetchError, CatalogSource, CheckoutStep, CompareError, ContactForm,
    EmailDeliveryError, EmailSender, GateState, SignupForm, StoreEvent, Storefront,
};
use shared::{
    domain::{Catalog, Product, ProductId},
    protocol::ContactTemplateParams,
};
use storage::Storage;
use tokio::sync::Mutex;

struct FixedCatalog(Result<Catalog, CatalogFetchError>);

#[async_trait]
impl CatalogSource for FixedCatalog {
    async fn fetch(&self) -> Result<Catalog, CatalogFetchError> {
        self.0.clone()
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<ContactTemplateParams>>);

#[async_trait]
impl EmailSender for Outbox {
    async fn send(&self, params: &ContactTemplateParams) -> Result<(), EmailDeliveryError> {
        self.0.lock().await.push(params.clone());
        Ok(())
    }
}

fn laptop(id: i64, name: &str, price: f64) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        price,
        old_price: None,
        category: Some("laptops".into()),
        best_seller: id % 2 == 1,
        specs: Some(vec!["16GB RAM".into()]),
        image: String::new(),
        description: None,
    }
}

fn catalog() -> Catalog {
    Catalog {
        laptops: (1..=4).map(|id| laptop(id, &format!("Laptop {id}"), 3000.0 + id as f64)).collect(),
        accessories: Vec::new(),
    }
}

async fn storefront(source: FixedCatalog) -> (Storefront, Arc<Outbox>) {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let outbox = Arc::new(Outbox::default());
    let store = Storefront::with_dependencies(
        storage,
        Arc::new(source),
        Duration::from_secs(1),
        outbox.clone(),
    );
    (store, outbox)
}

#[tokio::test]
async fn shopper_session_from_start_to_checkout() {
    let (mut store, outbox) = storefront(FixedCatalog(Ok(catalog()))).await;

    let started = store.start().await.expect("start");
    assert!(started.welcome.is_some());
    assert_eq!(store.catalog().state(), GateState::Ready);

    for id in 1..=3 {
        store.toggle_compare(ProductId(id), true).expect("select");
    }
    let mut rx = store.subscribe_events();
    assert_eq!(
        store.toggle_compare(ProductId(4), true),
        Err(CompareError::CapacityExceeded { capacity: 3 })
    );
    match rx.recv().await.expect("notice") {
        StoreEvent::Notice(notice) => {
            assert_eq!(notice.message, "You can only compare up to 3 laptops at once")
        }
        other => panic!("unexpected event: {other:?}"),
    }
    let table = store.comparison_table().await.expect("table");
    assert_eq!(table.products.len(), 3);

    let summary = store.add_to_cart(ProductId(2)).await.expect("add");
    assert_eq!(summary.lines.len(), 1);
    assert!(matches!(
        store.checkout().await,
        Err(CartError::LoginRequired)
    ));

    store
        .accounts()
        .signup(&SignupForm {
            name: "Ana".into(),
            email: "ana@pczone.my".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        })
        .await
        .expect("signup");
    assert_eq!(store.checkout().await.expect("checkout"), CheckoutStep::Payment);

    store
        .contact()
        .submit(&ContactForm {
            name: "Ana".into(),
            email: "ana@pczone.my".into(),
            subject: "Order".into(),
            message: "When does it ship?".into(),
        })
        .await
        .expect("contact");
    assert_eq!(outbox.0.lock().await.len(), 1);
}

#[tokio::test]
async fn unavailable_catalog_degrades_to_empty_store() {
    let (store, _) = storefront(FixedCatalog(Err(CatalogFetchError::Network(
        "offline".into(),
    ))))
    .await;

    store.start().await.expect("start");

    assert_eq!(store.catalog().state(), GateState::FailedFallback);
    assert!(store.catalog().is_ready());
    assert_eq!(store.catalog().all_products().count(), 0);
    assert!(matches!(
        store.add_to_cart(ProductId(1)).await,
        Err(CartError::ProductNotFound(ProductId(1)))
    ));
}
