//! Readiness-gated product catalog.
//!
//! The catalog is fetched at most once per [`CatalogGate`]. Callers that arrive
//! while the fetch is in flight wait on the gate's state channel and resume
//! when it reaches a terminal state. A failed fetch leaves the catalog empty
//! but still marks the gate ready so nothing waits forever.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Catalog, Category, Product, ProductId},
    protocol::CatalogDocument,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    error::CatalogFetchError,
    events::{EventBus, StoreEvent},
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://api.jsonbin.io";
pub const DEFAULT_CATALOG_BIN_ID: &str = "68ad7eb2d0ea881f4065d8e3";
pub const ACCESS_KEY_HEADER: &str = "X-Access-Key";

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Catalog, CatalogFetchError>;
}

/// Reads the latest version of a catalog document from a JSONBin-style store.
pub struct JsonBinSource {
    http: Client,
    url: String,
    access_key: String,
    timeout: Duration,
}

impl JsonBinSource {
    pub fn new(
        base_url: &str,
        bin_id: &str,
        access_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogFetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogFetchError::Network(e.to_string()))?;
        Ok(Self::with_client(http, base_url, bin_id, access_key, timeout))
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        bin_id: &str,
        access_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: format!("{}/v3/b/{bin_id}/latest", base_url.trim_end_matches('/')),
            access_key: access_key.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for JsonBinSource {
    async fn fetch(&self) -> Result<Catalog, CatalogFetchError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .http
            .get(&self.url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CatalogFetchError::from_transport(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogFetchError::Network(format!(
                "catalog store responded with HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogFetchError::from_transport(e, timeout_ms))?;
        let document: CatalogDocument = serde_json::from_slice(&body)
            .map_err(|e| CatalogFetchError::Decode(e.to_string()))?;
        Ok(document.record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unloaded,
    Loading,
    Ready,
    FailedFallback,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GateState::Ready | GateState::FailedFallback)
    }
}

pub struct CatalogGate {
    source: Arc<dyn CatalogSource>,
    fetch_timeout: Duration,
    state: watch::Sender<GateState>,
    catalog: OnceLock<Catalog>,
    last_error: OnceLock<CatalogFetchError>,
    events: Option<EventBus>,
}

impl CatalogGate {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self::with_timeout(source, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn CatalogSource>, fetch_timeout: Duration) -> Self {
        let (state, _) = watch::channel(GateState::Unloaded);
        Self {
            source,
            fetch_timeout,
            state,
            catalog: OnceLock::new(),
            last_error: OnceLock::new(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn last_error(&self) -> Option<&CatalogFetchError> {
        self.last_error.get()
    }

    /// Loads the catalog unless a terminal state was already reached.
    ///
    /// Only one fetch is ever in flight. If the caller driving that fetch is
    /// dropped mid-way the gate falls back to `Unloaded` and the next waiter
    /// takes over.
    pub async fn ensure_loaded(&self) {
        let mut state_rx = self.state.subscribe();
        loop {
            if self.claim_fetch() {
                let mut abandon = AbandonGuard {
                    state: &self.state,
                    armed: true,
                };
                self.fetch_and_settle().await;
                abandon.armed = false;
                return;
            }

            let observed = match state_rx.wait_for(|s| *s != GateState::Loading).await {
                Ok(state) => *state,
                Err(_) => return,
            };
            if observed.is_terminal() {
                return;
            }
        }
    }

    /// Product with `id` in any category. `None` before the gate is ready.
    pub fn product_by_id(&self, id: ProductId) -> Option<&Product> {
        self.catalog.get()?.find(id)
    }

    /// Products of a named category in document order; empty for unknown names
    /// or while the catalog is unavailable.
    pub fn category(&self, name: &str) -> &[Product] {
        match name.parse::<Category>() {
            Ok(category) => self.products_in(category),
            Err(_) => &[],
        }
    }

    pub fn products_in(&self, category: Category) -> &[Product] {
        match self.catalog.get() {
            Some(catalog) => catalog.category(category),
            None => &[],
        }
    }

    pub fn all_products(&self) -> impl Iterator<Item = &Product> {
        self.catalog.get().into_iter().flat_map(|catalog| catalog.iter())
    }

    fn claim_fetch(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == GateState::Unloaded {
                *state = GateState::Loading;
                true
            } else {
                false
            }
        })
    }

    async fn fetch_and_settle(&self) {
        info!(
            timeout_ms = self.fetch_timeout.as_millis() as u64,
            "catalog: loading from remote source"
        );

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(Ok(catalog)) => validate(catalog),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CatalogFetchError::Timeout {
                after_ms: self.fetch_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(catalog) => {
                let laptops = catalog.laptops.len();
                let accessories = catalog.accessories.len();
                let _ = self.catalog.set(catalog);
                self.state.send_replace(GateState::Ready);
                info!(laptops, accessories, "catalog: loaded");
                self.publish(StoreEvent::CatalogLoaded {
                    laptops,
                    accessories,
                });
            }
            Err(err) => {
                error!(error = %err, "catalog: load failed, continuing with empty catalog");
                let reason = err.to_string();
                let _ = self.last_error.set(err);
                self.state.send_replace(GateState::FailedFallback);
                self.publish(StoreEvent::CatalogUnavailable { reason });
            }
        }
    }

    fn publish(&self, event: StoreEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

fn validate(catalog: Catalog) -> Result<Catalog, CatalogFetchError> {
    if let Some(id) = catalog.duplicate_id() {
        return Err(CatalogFetchError::Decode(format!(
            "product id {id} appears more than once"
        )));
    }
    Ok(catalog)
}

struct AbandonGuard<'a> {
    state: &'a watch::Sender<GateState>,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reset = self.state.send_if_modified(|state| {
            if *state == GateState::Loading {
                *state = GateState::Unloaded;
                true
            } else {
                false
            }
        });
        if reset {
            warn!("catalog: in-flight load abandoned, gate reset");
        }
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
