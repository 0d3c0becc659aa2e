use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use storage::{CookieJar, KeyValueStore, LocalStore, SessionStore};
use tracing::info;
use uuid::Uuid;

use crate::listing::STORE_NAME;

pub const WELCOME_SHOWN_KEY: &str = "welcomeShown";
pub const STATUS_MESSAGE_KEY: &str = "statusMessage";
pub const SESSION_START_KEY: &str = "sessionStart";
pub const CURRENT_PAGE_KEY: &str = "currentPage";
pub const VISITOR_COOKIE: &str = "visitorId";
pub const LAST_VISIT_COOKIE: &str = "lastVisit";
pub const COOKIE_LIFETIME_DAYS: i64 = 7;
const VISITOR_ID_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub welcome: Option<String>,
    pub status_message: Option<String>,
    pub visitor_id: String,
    pub started_at: DateTime<Utc>,
}

/// App start-up bookkeeping: first-visit welcome, queued status messages and
/// visitor cookies.
pub struct SessionBootstrap {
    local: LocalStore,
    session: SessionStore,
    cookies: CookieJar,
}

impl SessionBootstrap {
    pub fn new(local: LocalStore, session: SessionStore, cookies: CookieJar) -> Self {
        Self {
            local,
            session,
            cookies,
        }
    }

    pub async fn start(&self) -> Result<SessionStart> {
        let welcome = if self.local.get_item(WELCOME_SHOWN_KEY).await?.is_none() {
            self.local.set_item(WELCOME_SHOWN_KEY, "true").await?;
            Some(format!("Welcome to {STORE_NAME}! Enjoy shopping with us."))
        } else {
            None
        };

        let status_message = self.session.take_item(STATUS_MESSAGE_KEY).await;

        let started_at = Utc::now();
        let stamp = started_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.session.set_item(SESSION_START_KEY, &stamp).await?;

        let lifetime = Duration::days(COOKIE_LIFETIME_DAYS);
        let visitor_id = generate_visitor_id();
        self.cookies.set(VISITOR_COOKIE, &visitor_id, lifetime).await?;
        self.cookies.set(LAST_VISIT_COOKIE, &stamp, lifetime).await?;
        self.cookies.purge_expired().await?;

        info!(first_visit = welcome.is_some(), "session: started");
        Ok(SessionStart {
            welcome,
            status_message,
            visitor_id,
            started_at,
        })
    }

    /// Queues a message to show on the next start.
    pub async fn queue_status_message(&self, message: &str) -> Result<()> {
        self.session.set_item(STATUS_MESSAGE_KEY, message).await
    }

    pub async fn remember_page(&self, page: &str) -> Result<()> {
        self.session.set_item(CURRENT_PAGE_KEY, page).await
    }

    pub async fn last_page(&self) -> Result<Option<String>> {
        self.session.get_item(CURRENT_PAGE_KEY).await
    }
}

fn generate_visitor_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(VISITOR_ID_LEN)
        .collect()
}
