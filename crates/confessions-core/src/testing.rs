//! In-crate test doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Semaphore;

use crate::db::KeyValueStore;
use crate::error::{Error, Result};
use crate::models::{Confession, ConfessionId, Identity, LikeRecord};
use crate::store::ConfessionStore;

/// A like mutation as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeWrite {
    Insert(LikeRecord),
    Delete(ConfessionId, Identity),
}

/// Store double with call counters, failure switches and a gate that parks
/// like mutations until released.
pub struct ScriptedStore {
    confessions: Mutex<Vec<Confession>>,
    likes: Mutex<Vec<LikeRecord>>,
    like_writes: Mutex<Vec<LikeWrite>>,
    list_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hold_writes: AtomicBool,
    held: AtomicUsize,
    gate: Semaphore,
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self {
            confessions: Mutex::new(Vec::new()),
            likes: Mutex::new(Vec::new()),
            like_writes: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hold_writes: AtomicBool::new(false),
            held: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }
}

impl ScriptedStore {
    /// Add a confession whose creation time equals its id.
    pub fn seed(&self, id: i64, text: &str, like_count: u32) {
        self.confessions.lock().unwrap().push(Confession {
            id: ConfessionId::new(id),
            text: text.to_string(),
            created_at: id,
            like_count,
        });
    }

    /// Add a like record without touching counts.
    pub fn seed_like(&self, id: i64, identity: &Identity) {
        self.likes
            .lock()
            .unwrap()
            .push(LikeRecord::new(ConfessionId::new(id), identity));
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Park every like mutation until [`ScriptedStore::release`].
    pub fn hold_writes(&self) {
        self.hold_writes.store(true, Ordering::SeqCst);
    }

    /// Let one parked mutation continue.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Number of like mutations currently parked.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    /// Yield until at least one mutation is parked.
    pub async fn wait_until_held(&self) {
        while self.held() == 0 {
            tokio::task::yield_now().await;
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn like_writes(&self) -> Vec<LikeWrite> {
        self.like_writes.lock().unwrap().clone()
    }

    pub fn like_count(&self, id: i64) -> u32 {
        self.confessions
            .lock()
            .unwrap()
            .iter()
            .find(|confession| confession.id.get() == id)
            .map_or(0, |confession| confession.like_count)
    }

    async fn pass_gate(&self) {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.held.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            self.held.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(Error::Api("scripted read failure (503)".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Api("scripted write failure (500)".to_string()))
        } else {
            Ok(())
        }
    }

    fn adjust_count(&self, id: ConfessionId, liked: bool) {
        if let Some(confession) = self
            .confessions
            .lock()
            .unwrap()
            .iter_mut()
            .find(|confession| confession.id == id)
        {
            confession.like_count = if liked {
                confession.like_count + 1
            } else {
                confession.like_count.saturating_sub(1)
            };
        }
    }
}

fn owned_by(record: &LikeRecord, identity: &Identity) -> bool {
    match identity {
        Identity::Generated(token) => record.anonymous_user_id.as_deref() == Some(token.as_str()),
        Identity::Platform(fid) => record.fid == Some(*fid),
    }
}

impl ConfessionStore for ScriptedStore {
    async fn insert_confession(&self, text: &str) -> Result<Confession> {
        self.check_writes()?;
        let mut confessions = self.confessions.lock().unwrap();
        let next = confessions
            .iter()
            .map(|confession| confession.id.get().max(confession.created_at))
            .max()
            .unwrap_or(0)
            + 1;
        let confession = Confession {
            id: ConfessionId::new(next),
            text: text.to_string(),
            created_at: next,
            like_count: 0,
        };
        confessions.push(confession.clone());
        Ok(confession)
    }

    async fn list_confessions(&self, limit: usize) -> Result<Vec<Confession>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let mut confessions = self.confessions.lock().unwrap().clone();
        confessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        confessions.truncate(limit);
        Ok(confessions)
    }

    async fn insert_like(&self, like: &LikeRecord) -> Result<()> {
        self.like_writes
            .lock()
            .unwrap()
            .push(LikeWrite::Insert(like.clone()));
        self.pass_gate().await;
        self.check_writes()?;

        {
            let mut likes = self.likes.lock().unwrap();
            if likes.contains(like) {
                return Err(Error::Conflict("duplicate like".to_string()));
            }
            likes.push(like.clone());
        }
        self.adjust_count(like.confession_id, true);
        Ok(())
    }

    async fn delete_like(&self, confession_id: ConfessionId, identity: &Identity) -> Result<()> {
        self.like_writes
            .lock()
            .unwrap()
            .push(LikeWrite::Delete(confession_id, identity.clone()));
        self.pass_gate().await;
        self.check_writes()?;

        let removed = {
            let mut likes = self.likes.lock().unwrap();
            let before = likes.len();
            likes.retain(|record| {
                !(record.confession_id == confession_id && owned_by(record, identity))
            });
            before != likes.len()
        };
        if removed {
            self.adjust_count(confession_id, false);
        }
        Ok(())
    }

    async fn list_liked(&self, identity: &Identity) -> Result<Vec<ConfessionId>> {
        self.check_reads()?;
        Ok(self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|record| owned_by(record, identity))
            .map(|record| record.confession_id)
            .collect())
    }
}

/// Key/value double with an optional failure switch.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    fail: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut values = store.values.lock().unwrap();
            for (key, value) in entries {
                values.insert((*key).to_string(), (*value).to_string());
            }
        }
        store
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Database("scripted storage failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
