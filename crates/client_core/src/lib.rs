use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use shared::domain::ProductId;
use storage::Storage;
use tokio::sync::broadcast;
use tracing::info;

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod compare;
pub mod contact;
pub mod error;
pub mod events;
pub mod listing;
pub mod newsletter;
pub mod session;
mod validation;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use accounts::{password_score, Accounts, PasswordStrength, SignupForm};
pub use cart::{Cart, CartSummary, CheckoutStep};
pub use catalog::{CatalogGate, CatalogSource, GateState, JsonBinSource};
pub use compare::{CompareIndicator, ComparisonSelector, ComparisonTable, COMPARE_CAPACITY};
pub use contact::{ContactDesk, ContactForm, EmailJsConfig, EmailJsSender, EmailSender};
pub use error::{
    AccountError, CartError, CatalogFetchError, CompareError, ContactError, EmailDeliveryError,
    FormField, ListingError, NewsletterError,
};
pub use events::{SelectionChanged, StoreEvent};
pub use listing::{BrowseQuery, SharePlatform, SortOrder};
pub use newsletter::Newsletter;
pub use session::{SessionBootstrap, SessionStart};
pub use validation::is_valid_email;

#[derive(Debug, Clone)]
pub struct CatalogEndpoint {
    pub base_url: String,
    pub bin_id: String,
    pub access_key: String,
    pub timeout: Duration,
}

impl Default for CatalogEndpoint {
    fn default() -> Self {
        Self {
            base_url: catalog::DEFAULT_CATALOG_BASE_URL.to_string(),
            bin_id: catalog::DEFAULT_CATALOG_BIN_ID.to_string(),
            access_key: String::new(),
            timeout: catalog::DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorefrontOptions {
    pub database_url: String,
    pub catalog: CatalogEndpoint,
    pub email: EmailJsConfig,
}

/// Everything one shopper session needs, wired to a single event bus.
pub struct Storefront {
    storage: Storage,
    events: events::EventBus,
    catalog: Arc<CatalogGate>,
    comparison: ComparisonSelector,
    cart: Cart,
    accounts: Accounts,
    newsletter: Newsletter,
    contact: ContactDesk,
    session: SessionBootstrap,
}

impl Storefront {
    pub async fn open(options: StorefrontOptions) -> Result<Self> {
        let storage = Storage::new(&options.database_url)
            .await
            .with_context(|| format!("failed to open storefront storage '{}'", options.database_url))?;
        let endpoint = &options.catalog;
        let source = JsonBinSource::new(
            &endpoint.base_url,
            &endpoint.bin_id,
            endpoint.access_key.clone(),
            endpoint.timeout,
        )
        .context("failed to build catalog client")?;
        let sender = EmailJsSender::new(options.email);
        Ok(Self::with_dependencies(
            storage,
            Arc::new(source),
            endpoint.timeout,
            Arc::new(sender),
        ))
    }

    pub fn with_dependencies(
        storage: Storage,
        catalog_source: Arc<dyn CatalogSource>,
        fetch_timeout: Duration,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        let events = events::event_bus();
        let local = Arc::new(storage.local());
        let session = Arc::new(storage.session());
        Self {
            catalog: Arc::new(
                CatalogGate::with_timeout(catalog_source, fetch_timeout)
                    .with_event_bus(events.clone()),
            ),
            comparison: ComparisonSelector::with_event_bus(events.clone()),
            cart: Cart::new(local.clone(), events.clone()),
            accounts: Accounts::new(local.clone(), session, events.clone()),
            newsletter: Newsletter::new(local),
            contact: ContactDesk::new(email_sender),
            session: SessionBootstrap::new(storage.local(), storage.session(), storage.cookies()),
            storage,
            events,
        }
    }

    /// Runs start-up bookkeeping and loads the catalog.
    pub async fn start(&self) -> Result<SessionStart> {
        self.storage.health_check().await?;
        self.accounts.migrate_legacy_user().await?;
        let started = self.session.start().await?;
        self.catalog.ensure_loaded().await;
        info!(
            state = ?self.catalog.state(),
            visitor_id = %started.visitor_id,
            "storefront: session ready"
        );
        Ok(started)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn catalog(&self) -> &CatalogGate {
        &self.catalog
    }

    pub fn catalog_handle(&self) -> Arc<CatalogGate> {
        Arc::clone(&self.catalog)
    }

    pub fn comparison(&self) -> &ComparisonSelector {
        &self.comparison
    }

    /// Toggles a product's comparison checkbox and surfaces a rejection as a
    /// notice on the event bus.
    pub fn toggle_compare(&mut self, id: ProductId, checked: bool) -> Result<(), CompareError> {
        self.comparison.toggle(id, checked).inspect_err(|err| {
            let _ = self.events.send(StoreEvent::Notice(err.notice()));
        })
    }

    pub fn remove_from_comparison(&mut self, id: ProductId) {
        self.comparison.remove(id);
    }

    pub fn clear_comparison(&mut self) {
        self.comparison.clear();
    }

    pub async fn comparison_table(&self) -> Result<ComparisonTable, CompareError> {
        self.catalog.ensure_loaded().await;
        self.comparison.comparison_table(&self.catalog)
    }

    pub async fn add_to_cart(&self, id: ProductId) -> Result<cart::CartSummary, CartError> {
        self.cart.add(&self.catalog, id).await?;
        self.cart.summary().await
    }

    pub async fn checkout(&self) -> Result<CheckoutStep, CartError> {
        let outcome = self.cart.checkout(&self.accounts).await;
        if let Err(err) = &outcome {
            let _ = self.events.send(StoreEvent::Notice(err.notice()));
        }
        outcome
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn newsletter(&self) -> &Newsletter {
        &self.newsletter
    }

    pub fn contact(&self) -> &ContactDesk {
        &self.contact
    }

    pub fn session(&self) -> &SessionBootstrap {
        &self.session
    }
}
