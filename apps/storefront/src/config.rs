use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{catalog, contact::DEFAULT_EMAILJS_URL, CatalogEndpoint, EmailJsConfig};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub catalog_base_url: String,
    pub catalog_bin_id: String,
    pub catalog_access_key: String,
    pub catalog_timeout_ms: u64,
    pub emailjs_url: String,
    pub emailjs_service_id: String,
    pub emailjs_template_id: String,
    pub emailjs_user_id: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/storefront.db".into(),
            catalog_base_url: catalog::DEFAULT_CATALOG_BASE_URL.into(),
            catalog_bin_id: catalog::DEFAULT_CATALOG_BIN_ID.into(),
            catalog_access_key: String::new(),
            catalog_timeout_ms: catalog::DEFAULT_FETCH_TIMEOUT.as_millis() as u64,
            emailjs_url: DEFAULT_EMAILJS_URL.into(),
            emailjs_service_id: String::new(),
            emailjs_template_id: String::new(),
            emailjs_user_id: String::new(),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn catalog_endpoint(&self) -> CatalogEndpoint {
        CatalogEndpoint {
            base_url: self.catalog_base_url.clone(),
            bin_id: self.catalog_bin_id.clone(),
            access_key: self.catalog_access_key.clone(),
            timeout: Duration::from_millis(self.catalog_timeout_ms),
        }
    }

    pub fn email(&self) -> EmailJsConfig {
        EmailJsConfig {
            endpoint: self.emailjs_url.clone(),
            service_id: self.emailjs_service_id.clone(),
            template_id: self.emailjs_template_id.clone(),
            user_id: self.emailjs_user_id.clone(),
        }
    }

    fn apply(&mut self, key: &str, value: String) {
        match key {
            "database_url" => self.database_url = value,
            "catalog_base_url" => self.catalog_base_url = value,
            "catalog_bin_id" => self.catalog_bin_id = value,
            "catalog_access_key" => self.catalog_access_key = value,
            "catalog_timeout_ms" => {
                if let Ok(parsed) = value.trim().parse::<u64>() {
                    self.catalog_timeout_ms = parsed;
                }
            }
            "emailjs_url" => self.emailjs_url = value,
            "emailjs_service_id" => self.emailjs_service_id = value,
            "emailjs_template_id" => self.emailjs_template_id = value,
            "emailjs_user_id" => self.emailjs_user_id = value,
            "log_filter" => self.log_filter = value,
            _ => {}
        }
    }
}

const KEYS: [&str; 10] = [
    "database_url",
    "catalog_base_url",
    "catalog_bin_id",
    "catalog_access_key",
    "catalog_timeout_ms",
    "emailjs_url",
    "emailjs_service_id",
    "emailjs_template_id",
    "emailjs_user_id",
    "log_filter",
];

/// Defaults, then `storefront.toml`, then `STOREFRONT_*` and `APP__*`
/// environment variables (the latter wins).
pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            for (key, value) in file_cfg {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                settings.apply(&key, value);
            }
        }
    }

    for key in KEYS {
        let upper = key.to_ascii_uppercase();
        if let Some(v) = env(&format!("STOREFRONT_{upper}")) {
            settings.apply(key, v);
        }
        if let Some(v) = env(&format!("APP__{upper}")) {
            settings.apply(key, v);
        }
    }
    if let Some(v) = env("DATABASE_URL") {
        if env("STOREFRONT_DATABASE_URL").is_none() && env("APP__DATABASE_URL").is_none() {
            settings.database_url = v;
        }
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .and_then(|rest| rest.split('?').next())
        .filter(|path| !path.is_empty())
    else {
        return Ok(());
    };

    let Some(parent) = Path::new(path).parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}
