//! Identity resolution.
//!
//! A session acts either as a locally generated anonymous token or, when the
//! host platform exposes a signed-in user, as that user's numeric id. The host
//! is asked once per session with a bounded wait; a platform id it yields is
//! persisted and keeps winning in later sessions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::db::KeyValueStore;
use crate::error::Result;
use crate::models::{generate_anonymous_token, Identity};

/// Key holding the generated anonymous token.
pub const ANONYMOUS_TOKEN_KEY: &str = "anonymous_user_id";
/// Key holding the last platform id the host reported.
pub const PLATFORM_ID_KEY: &str = "platform_fid";

/// Source of a host-issued identity (async)
#[allow(async_fn_in_trait)]
pub trait HostIdentityProvider {
    /// Wait at most `timeout` for the host; `None` when no user id is available
    async fn try_resolve(&self, timeout: Duration) -> Option<i64>;
}

/// Host that is never present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl HostIdentityProvider for NoHost {
    async fn try_resolve(&self, _timeout: Duration) -> Option<i64> {
        None
    }
}

impl<H: HostIdentityProvider> HostIdentityProvider for Option<H> {
    async fn try_resolve(&self, timeout: Duration) -> Option<i64> {
        match self {
            Some(host) => host.try_resolve(timeout).await,
            None => None,
        }
    }
}

/// One readiness check against the host (async)
#[allow(async_fn_in_trait)]
pub trait HostProbe {
    /// `Ok(None)` while the host context is not available yet
    async fn probe(&self) -> Result<Option<HostContext>>;
}

/// Context object published by the host platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    #[serde(default)]
    pub user: Option<HostUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostUser {
    #[serde(default)]
    pub fid: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl HostContext {
    /// Numeric platform id of the signed-in user, if any.
    pub fn platform_id(&self) -> Option<i64> {
        self.user.as_ref().and_then(|user| user.fid)
    }
}

/// Polls a [`HostProbe`] at a fixed interval until it reports a context or the
/// timeout elapses.
#[derive(Debug, Clone)]
pub struct PollingHost<P> {
    probe: P,
    interval: Duration,
}

impl<P: HostProbe> PollingHost<P> {
    pub fn new(probe: P, interval: Duration) -> Self {
        Self {
            probe,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

impl<P: HostProbe> HostIdentityProvider for PollingHost<P> {
    async fn try_resolve(&self, timeout: Duration) -> Option<i64> {
        let poll = async {
            loop {
                match self.probe.probe().await {
                    Ok(Some(context)) => {
                        let platform_id = context.platform_id();
                        if platform_id.is_none() {
                            tracing::info!("Host context has no platform user id");
                        }
                        return platform_id;
                    }
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!("Host identity discovery failed: {}", error);
                        return None;
                    }
                }
                tokio::time::sleep(self.interval).await;
            }
        };

        if let Ok(platform_id) = tokio::time::timeout(timeout, poll).await {
            platform_id
        } else {
            tracing::info!("No host identity context after {:?}", timeout);
            None
        }
    }
}

/// Host context published as a JSON file; missing file means "not ready".
#[derive(Debug, Clone)]
pub struct FileHostProbe {
    path: PathBuf,
}

impl FileHostProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostProbe for FileHostProbe {
    async fn probe(&self) -> Result<Option<HostContext>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

/// Resolves the session identity once at startup.
pub struct IdentityResolver<K, H> {
    store: K,
    host: H,
    timeout: Duration,
}

impl<K: KeyValueStore, H: HostIdentityProvider> IdentityResolver<K, H> {
    pub const fn new(store: K, host: H, timeout: Duration) -> Self {
        Self {
            store,
            host,
            timeout,
        }
    }

    /// Resolve the identity for this session.
    ///
    /// Never fails: storage errors are logged and the session continues with
    /// whatever identity could still be determined.
    pub async fn resolve(&self) -> Identity {
        let token = self.load_or_create_token().await;

        if let Some(platform_id) = self.host.try_resolve(self.timeout).await {
            if let Err(error) = self
                .store
                .set(PLATFORM_ID_KEY, &platform_id.to_string())
                .await
            {
                tracing::warn!("Failed to persist platform id: {}", error);
            }
            tracing::info!("Using host platform identity {}", platform_id);
            return Identity::Platform(platform_id);
        }

        if let Some(platform_id) = self.stored_platform_id().await {
            tracing::info!("Using stored platform identity {}", platform_id);
            return Identity::Platform(platform_id);
        }

        tracing::info!("Using anonymous identity");
        Identity::Generated(token)
    }

    async fn load_or_create_token(&self) -> String {
        match self.store.get(ANONYMOUS_TOKEN_KEY).await {
            Ok(Some(token)) if !token.trim().is_empty() => return token,
            Ok(_) => {}
            Err(error) => tracing::warn!("Failed to read anonymous token: {}", error),
        }

        let token = generate_anonymous_token();
        if let Err(error) = self.store.set(ANONYMOUS_TOKEN_KEY, &token).await {
            tracing::warn!(
                "Failed to persist anonymous token; it will not survive this session: {}",
                error
            );
        }
        token
    }

    async fn stored_platform_id(&self) -> Option<i64> {
        match self.store.get(PLATFORM_ID_KEY).await {
            Ok(Some(raw)) => raw.trim().parse().ok(),
            Ok(None) => None,
            Err(error) => {
                tracing::warn!("Failed to read stored platform id: {}", error);
                None
            }
        }
    }
}
