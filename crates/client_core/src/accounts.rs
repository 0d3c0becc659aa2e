//! Client-side sign up and login. Accounts live in local storage; the active
//! user lives in session storage and, with "remember me", in local storage.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use shared::protocol::{SessionUser, StoredAccount};
use storage::{read_json, write_json, KeyValueStore};
use tracing::{info, warn};

use crate::{
    error::{AccountError, FormField},
    events::{EventBus, StoreEvent},
    validation::same_email,
};

pub const USERS_KEY: &str = "users";
pub const USER_KEY: &str = "user";
pub const LEGACY_USER_KEY: &str = "registeredUser";
pub const LEGACY_PASSWORD: &str = "__legacy_no_password__";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Weak,
    Fair,
    Good,
    Strong,
}

impl PasswordStrength {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=2 => PasswordStrength::Weak,
            3 => PasswordStrength::Fair,
            4 => PasswordStrength::Good,
            _ => PasswordStrength::Strong,
        }
    }

    pub fn of(password: &str) -> Self {
        Self::from_score(password_score(password))
    }

    /// Fill percentage of the strength meter.
    pub fn meter_width(self) -> u8 {
        match self {
            PasswordStrength::Weak => 30,
            PasswordStrength::Fair => 60,
            PasswordStrength::Good => 80,
            PasswordStrength::Strong => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PasswordStrength::Weak => "Weak password",
            PasswordStrength::Fair => "Fair password",
            PasswordStrength::Good => "Good password",
            PasswordStrength::Strong => "Strong password",
        }
    }
}

/// One point each for length, lowercase, uppercase, digit and symbol.
pub fn password_score(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= MIN_PASSWORD_LEN,
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    checks.iter().filter(|passed| **passed).count() as u8
}

pub struct Accounts {
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    events: EventBus,
}

impl Accounts {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        events: EventBus,
    ) -> Self {
        Self {
            local,
            session,
            events,
        }
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<SessionUser, AccountError> {
        let name = form.name.trim();
        let email = form.email.trim();

        let missing: Vec<FormField> = [
            (FormField::Name, name.is_empty()),
            (FormField::Email, email.is_empty()),
            (FormField::Password, form.password.is_empty()),
            (FormField::ConfirmPassword, form.confirm_password.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, is_missing)| is_missing.then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(AccountError::MissingFields(missing));
        }
        if form.password != form.confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }

        let mut accounts = self.accounts().await?;
        if find_by_email(&accounts, email).is_some() {
            return Err(AccountError::EmailTaken);
        }
        accounts.push(StoredAccount {
            name: name.to_string(),
            email: email.to_string(),
            password: form.password.clone(),
        });
        write_json(self.local.as_ref(), USERS_KEY, &accounts).await?;

        let user = SessionUser {
            name: name.to_string(),
            email: email.to_string(),
            login_time: None,
            signup_time: Some(Utc::now()),
            remember_me: false,
        };
        write_json(self.session.as_ref(), USER_KEY, &user).await?;

        info!(accounts = accounts.len(), "accounts: signed up");
        self.publish_login_status().await;
        Ok(user)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SessionUser, AccountError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }

        let accounts = self.accounts().await?;
        let account = match find_by_email(&accounts, email) {
            Some(account) if account.password == password => account,
            _ => {
                warn!("accounts: rejected login attempt");
                return Err(AccountError::InvalidCredentials);
            }
        };

        let user = SessionUser {
            name: account.name.clone(),
            email: account.email.clone(),
            login_time: Some(Utc::now()),
            signup_time: None,
            remember_me,
        };
        write_json(self.session.as_ref(), USER_KEY, &user).await?;
        if remember_me {
            write_json(self.local.as_ref(), USER_KEY, &user).await?;
        } else {
            self.local.remove_item(USER_KEY).await?;
        }

        info!(remember_me, "accounts: logged in");
        self.publish_login_status().await;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        self.local.remove_item(USER_KEY).await?;
        self.session.remove_item(USER_KEY).await?;
        info!("accounts: logged out");
        self.publish_login_status().await;
        Ok(())
    }

    pub async fn is_logged_in(&self) -> Result<bool> {
        Ok(self.local.get_item(USER_KEY).await?.is_some()
            || self.session.get_item(USER_KEY).await?.is_some())
    }

    /// The remembered user wins over the session one.
    pub async fn current_user(&self) -> Result<Option<SessionUser>> {
        let raw = match self.local.get_item(USER_KEY).await? {
            Some(raw) => Some(raw),
            None => self.session.get_item(USER_KEY).await?,
        };
        Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    pub async fn display_name(&self) -> Result<String> {
        let name = match self.current_user().await? {
            Some(user) if !user.name.is_empty() => user.name,
            Some(user) if !user.email.is_empty() => user.email,
            Some(_) => "User".to_string(),
            None if self.is_logged_in().await? => "User".to_string(),
            None => "Guest".to_string(),
        };
        Ok(name)
    }

    /// Folds a single-user record from older releases into the account list.
    pub async fn migrate_legacy_user(&self) -> Result<bool> {
        let Some(raw) = self.local.get_item(LEGACY_USER_KEY).await? else {
            return Ok(false);
        };

        let mut migrated = false;
        if let Ok(legacy) = serde_json::from_str::<serde_json::Value>(&raw) {
            let email = legacy.get("email").and_then(|v| v.as_str()).unwrap_or("");
            if !email.is_empty() {
                let mut accounts = self.accounts().await?;
                if find_by_email(&accounts, email).is_none() {
                    let name = legacy.get("name").and_then(|v| v.as_str()).unwrap_or("");
                    accounts.push(StoredAccount {
                        name: name.to_string(),
                        email: email.to_string(),
                        password: LEGACY_PASSWORD.to_string(),
                    });
                    write_json(self.local.as_ref(), USERS_KEY, &accounts).await?;
                    migrated = true;
                }
            }
        }

        self.local.remove_item(LEGACY_USER_KEY).await?;
        if migrated {
            info!("accounts: migrated legacy registered user");
        }
        Ok(migrated)
    }

    async fn accounts(&self) -> Result<Vec<StoredAccount>> {
        Ok(read_json(self.local.as_ref(), USERS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn publish_login_status(&self) {
        let logged_in = self.is_logged_in().await.unwrap_or(false);
        let display_name = self
            .display_name()
            .await
            .unwrap_or_else(|_| "Guest".to_string());
        let _ = self.events.send(StoreEvent::LoginStatusChanged {
            logged_in,
            display_name,
        });
    }
}

fn find_by_email<'a>(accounts: &'a [StoredAccount], email: &str) -> Option<&'a StoredAccount> {
    accounts
        .iter()
        .find(|account| same_email(&account.email, email))
}

#[cfg(test)]
#[path = "tests/accounts_tests.rs"]
mod tests;
