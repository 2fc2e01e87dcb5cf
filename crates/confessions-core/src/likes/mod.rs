//! Like toggling with optimistic updates.
//!
//! Every toggle is one transition: the pre-toggle snapshot is captured, the
//! optimistic change is applied, and on failure the same snapshot restores the
//! membership and display count. At most one toggle per confession is in
//! flight; later toggles on it are ignored until the first one settles.

use serde::Serialize;

use crate::models::ConfessionId;
use crate::state::SessionState;

/// Like state of one (confession, identity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    Liked,
    Unliked,
}

impl LikeState {
    pub const fn from_membership(liked: bool) -> Self {
        if liked {
            Self::Liked
        } else {
            Self::Unliked
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Liked => Self::Unliked,
            Self::Unliked => Self::Liked,
        }
    }
}

/// A started toggle, keyed by the state it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeTransition {
    pub confession_id: ConfessionId,
    pub from: LikeState,
    /// Display count before the optimistic change
    pub previous_count: u32,
}

impl LikeTransition {
    pub const fn target(&self) -> LikeState {
        self.from.toggled()
    }

    /// Provisional count shown while the mutation is pending (floored at 0).
    pub const fn optimistic_count(&self) -> u32 {
        match self.target() {
            LikeState::Liked => self.previous_count.saturating_add(1),
            LikeState::Unliked => self.previous_count.saturating_sub(1),
        }
    }
}

/// Why a toggle did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRejected {
    /// Confession is not in the current feed
    NotFound,
    /// Another toggle on the confession is still waiting on the store
    InFlight,
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "state", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// Store accepted the mutation; the confession is now in this state
    Applied(LikeState),
    /// Ignored because an earlier toggle on the same confession is pending
    InFlight,
    /// Ignored because the confession is not in the feed
    NotFound,
}

impl From<ToggleRejected> for ToggleOutcome {
    fn from(value: ToggleRejected) -> Self {
        match value {
            ToggleRejected::NotFound => Self::NotFound,
            ToggleRejected::InFlight => Self::InFlight,
        }
    }
}

impl SessionState {
    /// Start a toggle: capture the snapshot and apply the optimistic change.
    pub fn begin_toggle(&mut self, id: ConfessionId) -> Result<LikeTransition, ToggleRejected> {
        if self.in_flight.contains_key(&id) {
            return Err(ToggleRejected::InFlight);
        }
        let from = LikeState::from_membership(self.feed.liked.contains(&id));
        let confession = self.confession_mut(id).ok_or(ToggleRejected::NotFound)?;

        let transition = LikeTransition {
            confession_id: id,
            from,
            previous_count: confession.like_count,
        };
        confession.like_count = transition.optimistic_count();
        self.set_membership(id, transition.target());
        self.in_flight.insert(id, transition);

        tracing::debug!(
            "Like toggle on {} started: {:?} -> {:?}",
            id,
            transition.from,
            transition.target()
        );
        Ok(transition)
    }

    /// The store accepted the mutation; keep the optimistic state.
    pub fn settle_toggle(&mut self, transition: &LikeTransition) {
        self.in_flight.remove(&transition.confession_id);
    }

    /// The store rejected the mutation; restore the pre-toggle snapshot.
    pub fn roll_back_toggle(&mut self, transition: &LikeTransition) {
        let id = transition.confession_id;
        self.in_flight.remove(&id);
        self.set_membership(id, transition.from);
        if let Some(confession) = self.confession_mut(id) {
            confession.like_count = transition.previous_count;
        }
    }
}
