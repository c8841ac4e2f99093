use std::{env, sync::OnceLock};

use anyhow::{Context, Result, ensure};

use crate::subscription::model::ApplicationServerKey;

#[derive(Debug, Clone)]
pub struct Config {
    pub vapid_public_key: ApplicationServerKey,
    pub backend_url: String,
    pub subscribe_path: String,
    pub worker_script: String,
    pub worker_scope: String,
    pub token_storage_key: String,
    pub token_file: String,
    pub notification_icon: String,
    pub fallback_title: String,
    pub app_root: String,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Defaults for everything except the application server key.
    pub fn new(vapid_public_key: ApplicationServerKey) -> Self {
        Self {
            vapid_public_key,
            backend_url: "http://localhost:5000".to_string(),
            subscribe_path: "/subscribe".to_string(),
            worker_script: "/service-worker.js".to_string(),
            worker_scope: "/".to_string(),
            token_storage_key: "token".to_string(),
            token_file: "storage.json".to_string(),
            notification_icon: "/Images/Aria.jpg".to_string(),
            fallback_title: "Notification".to_string(),
            app_root: "/".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = lookup("VAPID_PUBLIC_KEY").context("VAPID_PUBLIC_KEY must be set")?;
        let key = ApplicationServerKey::new(key.trim());
        let bytes = key.to_bytes().context("VAPID_PUBLIC_KEY is not base64url")?;
        ensure!(
            bytes.len() == 65 && bytes[0] == 0x04,
            "VAPID_PUBLIC_KEY must be an uncompressed P-256 point, got {} bytes",
            bytes.len()
        );

        let mut cfg = Self::new(key);
        let overrides: [(&str, &mut String); 9] = [
            ("BACKEND_URL", &mut cfg.backend_url),
            ("SUBSCRIBE_PATH", &mut cfg.subscribe_path),
            ("WORKER_SCRIPT", &mut cfg.worker_script),
            ("WORKER_SCOPE", &mut cfg.worker_scope),
            ("TOKEN_STORAGE_KEY", &mut cfg.token_storage_key),
            ("TOKEN_FILE", &mut cfg.token_file),
            ("NOTIFICATION_ICON", &mut cfg.notification_icon),
            ("FALLBACK_TITLE", &mut cfg.fallback_title),
            ("APP_ROOT", &mut cfg.app_root),
        ];
        for (name, slot) in overrides {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }

        url::Url::parse(&cfg.backend_url)
            .with_context(|| format!("BACKEND_URL {} is not a url", cfg.backend_url))?;
        Ok(cfg)
    }
}

/// Loads the process-wide config once; later calls return the same value.
pub fn init_config() -> Result<&'static Config> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let cfg = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| cfg))
}
