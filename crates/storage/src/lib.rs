//! Client-side storage: a persistent local store, a per-process session store
//! and a cookie jar with expiry.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;
use tracing::warn;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Reads a JSON value. Entries that fail to decode are logged and treated as absent.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = store.get_item(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(key, error = %err, "storage: ignoring undecodable entry");
            Ok(None)
        }
    }
}

pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to encode value for key '{key}'"))?;
    store.set_item(key, &raw).await
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    session: SessionStore,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open client storage at '{database_url}'"))?;
        let storage = Self {
            pool,
            session: SessionStore::default(),
        };
        storage.ensure_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub fn local(&self) -> LocalStore {
        LocalStore {
            pool: self.pool.clone(),
        }
    }

    pub fn session(&self) -> SessionStore {
        self.session.clone()
    }

    pub fn cookies(&self) -> CookieJar {
        CookieJar {
            pool: self.pool.clone(),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                item_key   TEXT PRIMARY KEY NOT NULL,
                item_value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure local_storage table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cookies (
                name       TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure cookies table exists")?;

        Ok(())
    }
}

/// Survives restarts; backed by the sqlite database.
#[derive(Clone)]
pub struct LocalStore {
    pool: Pool<Sqlite>,
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT item_value FROM local_storage WHERE item_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read local storage key '{key}'"))?;
        row.map(|row| row.try_get::<String, _>("item_value"))
            .transpose()
            .map_err(Into::into)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (item_key, item_value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(item_key) DO UPDATE SET
                item_value = excluded.item_value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write local storage key '{key}'"))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE item_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove local storage key '{key}'"))?;
        Ok(())
    }
}

/// Lives only as long as the process; cloned handles share the same entries.
#[derive(Clone, Default)]
pub struct SessionStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    /// Removes and returns an entry in one step.
    pub async fn take_item(&self, key: &str) -> Option<String> {
        self.items.lock().await.remove(key)
    }
}

#[async_trait]
impl KeyValueStore for SessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct CookieJar {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CookieJar {
    pub async fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<Cookie> {
        self.set_expiring_at(name, value, Utc::now() + max_age).await
    }

    pub async fn set_expiring_at(
        &self,
        name: &str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Cookie> {
        sqlx::query(
            r#"
            INSERT INTO cookies (name, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(name)
        .bind(value)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to set cookie '{name}'"))?;

        Ok(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            expires_at,
        })
    }

    /// Returns the cookie only while it has not expired.
    pub async fn get(&self, name: &str) -> Result<Option<Cookie>> {
        let row = sqlx::query("SELECT value, expires_at FROM cookies WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read cookie '{name}'"))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.try_get("value")?;
        let expires_raw: String = row.try_get("expires_at")?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_raw)
            .with_context(|| format!("cookie '{name}' has malformed expiry '{expires_raw}'"))?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            return Ok(None);
        }

        Ok(Some(Cookie {
            name: name.to_string(),
            value,
            expires_at,
        }))
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM cookies WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove cookie '{name}'"))?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let rows = sqlx::query("SELECT name, expires_at FROM cookies")
            .fetch_all(&self.pool)
            .await
            .context("failed to list cookies")?;
        let now = Utc::now();
        let mut removed = 0;
        for row in rows {
            let name: String = row.try_get("name")?;
            let expires_raw: String = row.try_get("expires_at")?;
            let expired = DateTime::parse_from_rfc3339(&expires_raw)
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(true);
            if expired {
                self.remove(&name).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
