use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Catalog, Product, ProductId};

/// Envelope returned by the hosted document store for the latest catalog version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub record: Catalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn id(&self) -> ProductId {
        self.product.id
    }

    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTemplateParams {
    pub title: String,
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Body of the email relay's `send` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSendRequest {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub template_params: ContactTemplateParams,
}
