use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{ContactTemplateParams, EmailSendRequest};
use tracing::{error, info};

use crate::{
    error::{ContactError, EmailDeliveryError, FormField},
    validation::is_valid_email,
};

pub const DEFAULT_EMAILJS_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, params: &ContactTemplateParams) -> Result<(), EmailDeliveryError>;
}

#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub endpoint: String,
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
}

/// Delivers contact messages through the EmailJS REST relay.
pub struct EmailJsSender {
    http: Client,
    config: EmailJsConfig,
}

impl EmailJsSender {
    pub fn new(config: EmailJsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmailSender for EmailJsSender {
    async fn send(&self, params: &ContactTemplateParams) -> Result<(), EmailDeliveryError> {
        let request = EmailSendRequest {
            service_id: self.config.service_id.clone(),
            template_id: self.config.template_id.clone(),
            user_id: self.config.user_id.clone(),
            template_params: params.clone(),
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailDeliveryError {
                status: None,
                text: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(EmailDeliveryError {
            status: Some(status.as_u16()),
            text,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

pub struct ContactDesk {
    sender: Arc<dyn EmailSender>,
}

impl ContactDesk {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    pub async fn submit(&self, form: &ContactForm) -> Result<(), ContactError> {
        let params = ContactTemplateParams {
            title: form.subject.trim().to_string(),
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            message: form.message.trim().to_string(),
        };

        let missing: Vec<FormField> = [
            (FormField::Name, &params.name),
            (FormField::Email, &params.email),
            (FormField::Subject, &params.title),
            (FormField::Message, &params.message),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.is_empty().then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(ContactError::MissingFields(missing));
        }
        if !is_valid_email(&params.email) {
            return Err(ContactError::InvalidEmail);
        }

        match self.sender.send(&params).await {
            Ok(()) => {
                info!("contact: message delivered");
                Ok(())
            }
            Err(err) => {
                error!(status = ?err.status, error = %err.text, "contact: delivery failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/contact_tests.rs"]
mod tests;
