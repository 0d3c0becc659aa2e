use std::sync::Arc;

use chrono::Utc;
use shared::protocol::{NewsletterSubscription, SubscriptionStatus};
use storage::{read_json, write_json, KeyValueStore};
use tracing::info;

use crate::{
    error::NewsletterError,
    validation::{is_valid_email, same_email},
};

pub const NEWSLETTER_KEY: &str = "newsletterEmails";

pub struct Newsletter {
    local: Arc<dyn KeyValueStore>,
}

impl Newsletter {
    pub fn new(local: Arc<dyn KeyValueStore>) -> Self {
        Self { local }
    }

    pub async fn subscribe(&self, email: &str) -> Result<NewsletterSubscription, NewsletterError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(NewsletterError::EmailRequired);
        }
        if !is_valid_email(email) {
            return Err(NewsletterError::InvalidEmail);
        }

        let mut subscriptions = self.subscriptions().await?;
        if subscriptions
            .iter()
            .any(|existing| same_email(&existing.email, email))
        {
            return Err(NewsletterError::AlreadySubscribed);
        }

        let subscription = NewsletterSubscription {
            email: email.to_string(),
            subscribed_at: Utc::now(),
            status: SubscriptionStatus::Active,
        };
        subscriptions.push(subscription.clone());
        write_json(self.local.as_ref(), NEWSLETTER_KEY, &subscriptions).await?;

        info!(subscribers = subscriptions.len(), "newsletter: subscribed");
        Ok(subscription)
    }

    pub async fn subscriptions(&self) -> Result<Vec<NewsletterSubscription>, NewsletterError> {
        Ok(read_json(self.local.as_ref(), NEWSLETTER_KEY)
            .await?
            .unwrap_or_default())
    }
}
