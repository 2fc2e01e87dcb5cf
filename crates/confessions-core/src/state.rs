//! In-memory session state shared by the feed and like flows.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::likes::{LikeState, LikeTransition};
use crate::models::{Confession, ConfessionId};

/// Feed as handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    /// Confessions, newest first
    pub confessions: Vec<Confession>,
    /// Confessions the current identity has liked
    pub liked: BTreeSet<ConfessionId>,
    /// Number of refreshes applied so far
    pub revision: u64,
}

impl FeedSnapshot {
    pub fn get(&self, id: ConfessionId) -> Option<&Confession> {
        self.confessions.iter().find(|confession| confession.id == id)
    }

    pub fn is_liked(&self, id: ConfessionId) -> bool {
        self.liked.contains(&id)
    }
}

/// Session-owned feed cache plus the like toggles still waiting on the store.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(crate) feed: FeedSnapshot,
    pub(crate) in_flight: HashMap<ConfessionId, LikeTransition>,
}

impl SessionState {
    pub const fn snapshot(&self) -> &FeedSnapshot {
        &self.feed
    }

    pub fn is_in_flight(&self, id: ConfessionId) -> bool {
        self.in_flight.contains_key(&id)
    }

    pub(crate) fn confession_mut(&mut self, id: ConfessionId) -> Option<&mut Confession> {
        self.feed
            .confessions
            .iter_mut()
            .find(|confession| confession.id == id)
    }

    pub(crate) fn set_membership(&mut self, id: ConfessionId, state: LikeState) {
        match state {
            LikeState::Liked => self.feed.liked.insert(id),
            LikeState::Unliked => self.feed.liked.remove(&id),
        };
    }

    /// Replace the cached feed with freshly fetched data.
    ///
    /// Toggles still in flight keep their optimistic membership and count.
    /// When the fetched row does not reflect the pending write yet, its count
    /// is shifted by one toward the target state (floored at 0).
    pub fn apply_refresh(&mut self, confessions: Vec<Confession>, liked: BTreeSet<ConfessionId>) {
        self.feed.confessions = confessions;
        self.feed.liked = liked;
        self.feed.revision += 1;

        let pending = self
            .in_flight
            .values()
            .map(|transition| (transition.confession_id, transition.target()))
            .collect::<Vec<_>>();
        for (id, target) in pending {
            let fetched = LikeState::from_membership(self.feed.liked.contains(&id));
            self.set_membership(id, target);
            if fetched == target {
                continue;
            }
            if let Some(confession) = self.confession_mut(id) {
                confession.like_count = match target {
                    LikeState::Liked => confession.like_count.saturating_add(1),
                    LikeState::Unliked => confession.like_count.saturating_sub(1),
                };
            }
        }
    }
}
