use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;
use url::Url;

use datatable_sync::poller::DEFAULT_REFRESH_INTERVAL_MS;
use datatable_sync::Translations;

use crate::constants::{
    DEFAULT_HEARTBEAT_MS, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STATIC_DIR,
    DEFAULT_UPSTREAM_URL,
};

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) upstream_url: Url,
    pub(crate) upstream_cookie: Option<String>,
    pub(crate) port: u16,
    pub(crate) refresh_interval: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) heartbeat: Duration,
    pub(crate) static_dir: String,
    pub(crate) disable_background: bool,
    pub(crate) translations: Translations,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        let upstream = read_env_first(&["UPSTREAM_URL", "DASHBOARD_URL"]).unwrap_or_else(|| {
            warn!("UPSTREAM_URL not set; defaulting to {}", DEFAULT_UPSTREAM_URL);
            DEFAULT_UPSTREAM_URL.to_string()
        });
        let upstream_url = Url::parse(&upstream)
            .with_context(|| format!("UPSTREAM_URL is not a valid url: {}", upstream))?;
        let upstream_cookie = read_env_first(&["UPSTREAM_COOKIE"]);

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let refresh_interval = Duration::from_millis(
            read_millis("REFRESH_INTERVAL_MS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS),
        );
        let request_timeout = Duration::from_millis(
            read_millis("REQUEST_TIMEOUT_MS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        );
        let heartbeat =
            Duration::from_millis(read_millis("SSE_HEARTBEAT_MS").unwrap_or(DEFAULT_HEARTBEAT_MS));

        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string());

        let disable_background = env::var("DISABLE_BACKGROUND_TASKS")
            .map(|value| {
                let trimmed = value.trim();
                !trimmed.is_empty() && trimmed != "0"
            })
            .unwrap_or(false);

        let mut translations = Translations::default();
        if let Some(label) = read_env_first(&["NO_ITEMS_LABEL"]) {
            translations.no_items_label = label;
        }

        Ok(Self {
            upstream_url,
            upstream_cookie,
            port,
            refresh_interval,
            request_timeout,
            heartbeat,
            static_dir,
            disable_background,
            translations,
        })
    }
}

fn read_millis(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.trim().parse::<u64>().ok())
}

fn read_env_first(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}
