//! Actor identity model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by every locally generated token.
pub const ANONYMOUS_TOKEN_PREFIX: &str = "anon_";

/// The actor posting and liking confessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Identity {
    /// Locally generated opaque token
    Generated(String),
    /// Numeric id issued by the host platform
    Platform(i64),
}

impl Identity {
    /// Column that scopes like records for this identity kind.
    #[must_use]
    pub const fn owner_column(&self) -> &'static str {
        match self {
            Self::Generated(_) => "anonymous_user_id",
            Self::Platform(_) => "fid",
        }
    }

    /// Value matched against [`Identity::owner_column`].
    #[must_use]
    pub fn owner_value(&self) -> String {
        match self {
            Self::Generated(token) => token.clone(),
            Self::Platform(fid) => fid.to_string(),
        }
    }

    #[must_use]
    pub const fn is_platform(&self) -> bool {
        matches!(self, Self::Platform(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(token) => write!(f, "anonymous ({token})"),
            Self::Platform(fid) => write!(f, "platform fid {fid}"),
        }
    }
}

/// Generate a fresh anonymous token.
///
/// UUID v7 mixes the current Unix time in milliseconds with random bits, which
/// keeps tokens unique across devices of one deployment.
#[must_use]
pub fn generate_anonymous_token() -> String {
    format!("{ANONYMOUS_TOKEN_PREFIX}{}", Uuid::now_v7().simple())
}
