//! Client configuration.
//!
//! Provides a unified `ClientConfig` used by every Confessions front end to find
//! the hosted store, the host identity context, and the feed/discovery tuning.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Most confessions a single refresh fetches.
pub const FEED_PAGE_SIZE: usize = 50;
/// Upper bound on waiting for a host identity context.
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 5_000;
/// Delay between host identity probes.
pub const DEFAULT_DISCOVERY_POLL_INTERVAL_MS: u64 = 100;

/// Runtime client configuration.
///
/// The Supabase URL and anon key are public values; secrets never belong here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// JSON file published by the host platform with the signed-in user
    #[serde(default)]
    pub host_context_path: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    #[serde(default = "default_discovery_poll_interval_ms")]
    pub discovery_poll_interval_ms: u64,
}

const fn default_page_size() -> usize {
    FEED_PAGE_SIZE
}

const fn default_discovery_timeout_ms() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT_MS
}

const fn default_discovery_poll_interval_ms() -> u64 {
    DEFAULT_DISCOVERY_POLL_INTERVAL_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            host_context_path: None,
            page_size: FEED_PAGE_SIZE,
            discovery_timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
            discovery_poll_interval_ms: DEFAULT_DISCOVERY_POLL_INTERVAL_MS,
        }
    }
}

impl ClientConfig {
    /// Parse a config from JSON, applying defaults for omitted fields.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    /// Feed page size, clamped to `1..=FEED_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, FEED_PAGE_SIZE)
    }

    pub const fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// Poll interval, never zero so discovery cannot spin.
    pub fn discovery_poll_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_poll_interval_ms.max(1))
    }

    /// The `(url, anon_key)` pair when the hosted store is configured.
    ///
    /// Both values must be present together; one without the other is an error.
    pub fn supabase(&self) -> Result<Option<(String, String)>> {
        resolve_optional_supabase_config(self.supabase_url.clone(), self.supabase_anon_key.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((url, _)) = self.supabase()? {
            if !is_http_url(&url) {
                return Err(Error::InvalidInput(
                    "supabase_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.discovery_timeout_ms > 60_000 {
            return Err(Error::InvalidInput(
                "discovery_timeout_ms must not exceed 60000".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn resolve_optional_supabase_config(
    url: Option<String>,
    anon_key: Option<String>,
) -> Result<Option<(String, String)>> {
    let url = normalize_text_option(url);
    let anon_key = normalize_text_option(anon_key);

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
        (Some(_), None) => Err(Error::InvalidInput(
            "supabase_anon_key is required when supabase_url is set".to_string(),
        )),
        (None, Some(_)) => Err(Error::InvalidInput(
            "supabase_url is required when supabase_anon_key is set".to_string(),
        )),
    }
}
