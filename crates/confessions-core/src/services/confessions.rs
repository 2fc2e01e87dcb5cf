//! Session service shared by clients: owns the feed cache and runs posts,
//! refreshes and like toggles against a store.

use tokio::sync::{watch, Mutex};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::feed::FeedSynchronizer;
use crate::likes::{LikeState, ToggleOutcome};
use crate::models::{validate_confession_text, Confession, ConfessionId, Identity, LikeRecord};
use crate::state::{FeedSnapshot, SessionState};
use crate::store::ConfessionStore;

/// One session over a store, bound to a resolved identity.
pub struct ConfessionService<S> {
    store: S,
    identity: Identity,
    synchronizer: FeedSynchronizer,
    state: Mutex<SessionState>,
    updates: watch::Sender<FeedSnapshot>,
}

impl<S: ConfessionStore> ConfessionService<S> {
    /// Create a service with an empty feed.
    pub fn new(store: S, identity: Identity, config: &ClientConfig) -> Self {
        let (updates, _) = watch::channel(FeedSnapshot::default());
        Self {
            store,
            identity,
            synchronizer: FeedSynchronizer::new(config.page_size()),
            state: Mutex::new(SessionState::default()),
            updates,
        }
    }

    /// Create a service and load the first page.
    pub async fn start(store: S, identity: Identity, config: &ClientConfig) -> Self {
        let service = Self::new(store, identity, config);
        service.resynchronize().await;
        service
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Copy of the current feed.
    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().await.snapshot().clone()
    }

    /// Receive every snapshot this service publishes.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.updates.subscribe()
    }

    /// Refetch the feed and like memberships.
    ///
    /// Read failures are logged and leave the cached feed untouched. Returns
    /// whether the refresh was applied.
    pub async fn resynchronize(&self) -> bool {
        match self.synchronizer.fetch(&self.store, &self.identity).await {
            Ok((confessions, liked)) => {
                let mut state = self.state.lock().await;
                state.apply_refresh(confessions, liked);
                tracing::debug!(
                    "Feed refreshed: {} confessions, {} liked (revision {})",
                    state.snapshot().confessions.len(),
                    state.snapshot().liked.len(),
                    state.snapshot().revision
                );
                self.publish(&state);
                true
            }
            Err(error) => {
                tracing::warn!("Feed refresh failed, keeping cached feed: {error}");
                false
            }
        }
    }

    /// Post an anonymous confession and refresh the feed.
    pub async fn post(&self, text: &str) -> Result<Confession> {
        let text = validate_confession_text(text)?;
        let confession = self.store.insert_confession(&text).await?;
        tracing::info!("Posted confession {}", confession.id);
        self.resynchronize().await;
        Ok(confession)
    }

    /// Flip the like state of `id` for this session's identity.
    ///
    /// The feed changes immediately; a rejected write restores it and returns
    /// the error. Toggles on a confession that is already pending, or not in
    /// the feed, change nothing and reach no store.
    pub async fn toggle_like(&self, id: ConfessionId) -> Result<ToggleOutcome> {
        let transition = {
            let mut state = self.state.lock().await;
            match state.begin_toggle(id) {
                Ok(transition) => {
                    self.publish(&state);
                    transition
                }
                Err(rejected) => {
                    tracing::debug!("Like toggle on {id} ignored: {rejected:?}");
                    return Ok(rejected.into());
                }
            }
        };

        let written = match transition.target() {
            LikeState::Liked => {
                self.store
                    .insert_like(&LikeRecord::new(id, &self.identity))
                    .await
            }
            LikeState::Unliked => self.store.delete_like(id, &self.identity).await,
        };

        match written {
            Ok(()) => {
                self.state.lock().await.settle_toggle(&transition);
                self.resynchronize().await;
                Ok(ToggleOutcome::Applied(transition.target()))
            }
            Err(error) => {
                {
                    let mut state = self.state.lock().await;
                    state.roll_back_toggle(&transition);
                    self.publish(&state);
                }
                tracing::warn!("Like toggle on {id} failed, rolled back: {error}");
                Err(error)
            }
        }
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot().clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::identity::{HostIdentityProvider, IdentityResolver, ANONYMOUS_TOKEN_KEY};
    use crate::testing::{LikeWrite, MemoryKeyValueStore, ScriptedStore};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn anon() -> Identity {
        Identity::Generated("anon_me".to_string())
    }

    fn id(value: i64) -> ConfessionId {
        ConfessionId::new(value)
    }

    async fn service_with(store: ScriptedStore) -> ConfessionService<ScriptedStore> {
        ConfessionService::start(store, anon(), &ClientConfig::default()).await
    }

    fn count(snapshot: &FeedSnapshot, value: i64) -> u32 {
        snapshot.get(id(value)).unwrap().like_count
    }

    struct FixedHost(i64);

    impl HostIdentityProvider for FixedHost {
        async fn try_resolve(&self, _timeout: Duration) -> Option<i64> {
            Some(self.0)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn start_loads_first_page() {
        let store = ScriptedStore::default();
        store.seed(1, "first", 2);
        store.seed(2, "second", 0);
        store.seed_like(1, &anon());

        let service = service_with(store).await;
        let snapshot = service.snapshot().await;

        let ids = snapshot.confessions.iter().map(|c| c.id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(snapshot.liked, BTreeSet::from([id(1)]));
        assert_eq!(snapshot.revision, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_without_mutation_is_idempotent() {
        let store = ScriptedStore::default();
        store.seed(1, "a", 1);
        store.seed_like(1, &anon());
        let service = service_with(store).await;

        let first = service.snapshot().await;
        assert!(service.resynchronize().await);
        let second = service.snapshot().await;

        assert_eq!(first.confessions, second.confessions);
        assert_eq!(first.liked, second.liked);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn read_failure_keeps_stale_feed() {
        let store = ScriptedStore::default();
        store.seed(1, "a", 1);
        let service = service_with(store).await;
        let before = service.snapshot().await;

        service.store().fail_reads(true);
        assert!(!service.resynchronize().await);

        assert_eq!(service.snapshot().await, before);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn posted_confession_leads_refreshed_feed() {
        let store = ScriptedStore::default();
        store.seed(1, "older", 5);
        let service = service_with(store).await;

        let posted = service.post("  Hello world  ").await.unwrap();

        assert_eq!(posted.text, "Hello world");
        assert_eq!(posted.like_count, 0);
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.confessions[0].id, posted.id);
        assert_eq!(snapshot.confessions[0].like_count, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn post_rejects_blank_text_without_store_call() {
        let service = service_with(ScriptedStore::default()).await;
        let calls = service.store().list_calls();

        assert!(matches!(service.post("   ").await, Err(Error::InvalidInput(_))));
        assert_eq!(service.store().list_calls(), calls);
        assert!(service.snapshot().await.confessions.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn like_success_shows_server_truth() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;

        let outcome = service.toggle_like(id(7)).await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Applied(LikeState::Liked));
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.liked, BTreeSet::from([id(7)]));
        assert_eq!(count(&snapshot, 7), 4);
        assert_eq!(service.store().like_count(7), 4);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn like_shows_optimistic_state_before_settle() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;
        service.store().hold_writes();

        let (outcome, pending) = tokio::join!(service.toggle_like(id(7)), async {
            service.store().wait_until_held().await;
            let pending = service.snapshot().await;
            service.store().release();
            pending
        });

        assert_eq!(pending.liked, BTreeSet::from([id(7)]));
        assert_eq!(count(&pending, 7), 4);
        assert_eq!(outcome.unwrap(), ToggleOutcome::Applied(LikeState::Liked));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_during_pending_like_keeps_optimistic_count() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;
        service.store().hold_writes();

        let (outcome, refreshed) = tokio::join!(service.toggle_like(id(7)), async {
            service.store().wait_until_held().await;
            assert!(service.resynchronize().await);
            let refreshed = service.snapshot().await;
            service.store().release();
            refreshed
        });

        assert!(refreshed.is_liked(id(7)));
        assert_eq!(count(&refreshed, 7), 4);
        assert_eq!(outcome.unwrap(), ToggleOutcome::Applied(LikeState::Liked));
        assert_eq!(count(&service.snapshot().await, 7), 4);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn like_failure_restores_snapshot() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;
        let before = service.snapshot().await;

        service.store().fail_writes(true);
        let result = service.toggle_like(id(7)).await;

        assert!(matches!(result, Err(ref error) if error.is_transient()));
        let after = service.snapshot().await;
        assert_eq!(after.liked, before.liked);
        assert_eq!(after.confessions, before.confessions);
        assert!(after.liked.is_empty());
        assert_eq!(count(&after, 7), 3);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_toggle_can_be_retried_immediately() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;

        service.store().fail_writes(true);
        assert!(service.toggle_like(id(7)).await.is_err());
        service.store().fail_writes(false);

        assert_eq!(
            service.toggle_like(id(7)).await.unwrap(),
            ToggleOutcome::Applied(LikeState::Liked)
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sequential_toggles_follow_parity() {
        let store = ScriptedStore::default();
        store.seed(1, "a", 0);
        let service = service_with(store).await;

        for round in 1..=5 {
            service.toggle_like(id(1)).await.unwrap();
            let snapshot = service.snapshot().await;
            let liked = round % 2 == 1;
            assert_eq!(snapshot.is_liked(id(1)), liked);
            assert_eq!(count(&snapshot, 1), u32::from(liked));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn toggle_while_pending_changes_nothing() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;
        service.store().hold_writes();

        let (first, (second, during, pending)) = tokio::join!(service.toggle_like(id(7)), async {
            service.store().wait_until_held().await;
            let pending = service.snapshot().await;
            let second = service.toggle_like(id(7)).await;
            let during = service.snapshot().await;
            service.store().release();
            (second, during, pending)
        });

        assert_eq!(second.unwrap(), ToggleOutcome::InFlight);
        assert_eq!(during, pending);
        assert_eq!(first.unwrap(), ToggleOutcome::Applied(LikeState::Liked));
        assert_eq!(service.store().like_writes().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_confession_is_benign() {
        let store = ScriptedStore::default();
        store.seed(1, "a", 0);
        let service = service_with(store).await;
        let before = service.snapshot().await;

        assert_eq!(
            service.toggle_like(id(99)).await.unwrap(),
            ToggleOutcome::NotFound
        );
        assert_eq!(service.snapshot().await, before);
        assert!(service.store().like_writes().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unlike_deletes_by_identity() {
        let store = ScriptedStore::default();
        store.seed(3, "c", 1);
        store.seed_like(3, &anon());
        let service = service_with(store).await;

        let outcome = service.toggle_like(id(3)).await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Applied(LikeState::Unliked));
        assert_eq!(
            service.store().like_writes(),
            vec![LikeWrite::Delete(id(3), anon())]
        );
        assert_eq!(count(&service.snapshot().await, 3), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn discovered_platform_id_owns_every_write() {
        let keys = MemoryKeyValueStore::with(&[(ANONYMOUS_TOKEN_KEY, "anon_existing")]);
        let identity = IdentityResolver::new(&keys, FixedHost(42), Duration::from_millis(10))
            .resolve()
            .await;
        assert_eq!(identity, Identity::Platform(42));

        let store = ScriptedStore::default();
        store.seed(1, "a", 0);
        store.seed(2, "b", 0);
        let service = ConfessionService::start(store, identity, &ClientConfig::default()).await;

        service.toggle_like(id(1)).await.unwrap();
        service.toggle_like(id(2)).await.unwrap();
        service.toggle_like(id(1)).await.unwrap();

        let writes = service.store().like_writes();
        assert_eq!(writes.len(), 3);
        for write in writes {
            match write {
                LikeWrite::Insert(record) => {
                    assert_eq!(record.fid, Some(42));
                    assert_eq!(record.anonymous_user_id, None);
                }
                LikeWrite::Delete(_, owner) => assert_eq!(owner, Identity::Platform(42)),
            }
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribers_see_published_snapshots() {
        let store = ScriptedStore::default();
        store.seed(7, "seven", 3);
        let service = service_with(store).await;
        let mut updates = service.subscribe();
        assert_eq!(updates.borrow_and_update().revision, 1);

        service.toggle_like(id(7)).await.unwrap();

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest, service.snapshot().await);
        assert!(latest.is_liked(id(7)));
    }
}
