//! Feed fetching.

use std::collections::BTreeSet;

use crate::config::FEED_PAGE_SIZE;
use crate::error::Result;
use crate::models::{Confession, ConfessionId, Identity};
use crate::store::ConfessionStore;

/// Fetches the ranked feed and the identity's like memberships.
#[derive(Debug, Clone, Copy)]
pub struct FeedSynchronizer {
    page_size: usize,
}

impl Default for FeedSynchronizer {
    fn default() -> Self {
        Self::new(FEED_PAGE_SIZE)
    }
}

impl FeedSynchronizer {
    /// `page_size` is clamped to `1..=FEED_PAGE_SIZE`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, FEED_PAGE_SIZE),
        }
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch `(newest-first confessions, liked ids)` for `identity`.
    ///
    /// Liked ids outside the fetched page are dropped; the cache only tracks
    /// what the feed can show.
    pub async fn fetch<S: ConfessionStore>(
        &self,
        store: &S,
        identity: &Identity,
    ) -> Result<(Vec<Confession>, BTreeSet<ConfessionId>)> {
        let mut confessions = store.list_confessions(self.page_size).await?;
        rank(&mut confessions);
        confessions.truncate(self.page_size);

        let visible = confessions
            .iter()
            .map(|confession| confession.id)
            .collect::<BTreeSet<_>>();
        let liked = store
            .list_liked(identity)
            .await?
            .into_iter()
            .filter(|id| visible.contains(id))
            .collect();

        Ok((confessions, liked))
    }
}

/// Newest first; ids break timestamp ties since they grow with creation.
fn rank(confessions: &mut [Confession]) {
    confessions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
