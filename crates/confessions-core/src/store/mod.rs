//! Confession store abstraction.
//!
//! The store owns confessions, like records and the authoritative like counts.
//! Two implementations exist: the hosted Supabase REST store and the local
//! libSQL store. [`Backend`] picks one at runtime.

mod supabase;

pub use supabase::{normalize_rest_url, SupabaseStore};

use crate::db::LibSqlConfessionStore;
use crate::error::Result;
use crate::models::{Confession, ConfessionId, Identity, LikeRecord};

/// Operations the feed and like flows need from a store (async)
#[allow(async_fn_in_trait)]
pub trait ConfessionStore {
    /// Create an anonymous confession; the store assigns id, timestamp and count
    async fn insert_confession(&self, text: &str) -> Result<Confession>;

    /// List confessions newest first, at most `limit`
    async fn list_confessions(&self, limit: usize) -> Result<Vec<Confession>>;

    /// Record a like; a duplicate for the same identity is a conflict
    async fn insert_like(&self, like: &LikeRecord) -> Result<()>;

    /// Remove the identity's like on a confession, if any
    async fn delete_like(&self, confession_id: ConfessionId, identity: &Identity) -> Result<()>;

    /// Ids of every confession the identity has liked
    async fn list_liked(&self, identity: &Identity) -> Result<Vec<ConfessionId>>;
}

/// Store selected at startup.
pub enum Backend {
    Hosted(SupabaseStore),
    Local(LibSqlConfessionStore),
}

impl Backend {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Hosted(_) => "supabase",
            Self::Local(_) => "local",
        }
    }
}

impl ConfessionStore for Backend {
    async fn insert_confession(&self, text: &str) -> Result<Confession> {
        match self {
            Self::Hosted(store) => store.insert_confession(text).await,
            Self::Local(store) => store.insert_confession(text).await,
        }
    }

    async fn list_confessions(&self, limit: usize) -> Result<Vec<Confession>> {
        match self {
            Self::Hosted(store) => store.list_confessions(limit).await,
            Self::Local(store) => store.list_confessions(limit).await,
        }
    }

    async fn insert_like(&self, like: &LikeRecord) -> Result<()> {
        match self {
            Self::Hosted(store) => store.insert_like(like).await,
            Self::Local(store) => store.insert_like(like).await,
        }
    }

    async fn delete_like(&self, confession_id: ConfessionId, identity: &Identity) -> Result<()> {
        match self {
            Self::Hosted(store) => store.delete_like(confession_id, identity).await,
            Self::Local(store) => store.delete_like(confession_id, identity).await,
        }
    }

    async fn list_liked(&self, identity: &Identity) -> Result<Vec<ConfessionId>> {
        match self {
            Self::Hosted(store) => store.list_liked(identity).await,
            Self::Local(store) => store.list_liked(identity).await,
        }
    }
}
