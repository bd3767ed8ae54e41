use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{KvStore, Result, StoreError};

#[derive(Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process store with the same atomicity as the redis backend: every
/// operation runs under one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Write a hash without touching any index, the way a crash between two
    /// non-atomic writes would leave it.
    pub fn seed_hash(&self, key: &str, fields: Vec<(String, Vec<u8>)>) -> Result<()> {
        self.lock()?
            .hashes
            .insert(key.to_string(), fields.into_iter().collect());
        Ok(())
    }

    /// Add an index entry without a backing hash.
    pub fn seed_member(&self, set: &str, member: &str) -> Result<()> {
        self.lock()?
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    pub fn has_hash(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.hashes.contains_key(key))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn read_record(
        &self,
        key: &str,
        set: &str,
        member: &str,
    ) -> Result<(HashMap<String, Vec<u8>>, bool)> {
        let inner = self.lock()?;
        let fields = inner.hashes.get(key).cloned().unwrap_or_default();
        let indexed = inner.sets.get(set).is_some_and(|s| s.contains(member));
        Ok((fields, indexed))
    }

    async fn members(&self, set: &str) -> Result<Vec<String>> {
        let inner = self.lock()?;
        Ok(inner
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn write_record(
        &self,
        key: &str,
        fields: Vec<(String, Vec<u8>)>,
        set: &str,
        member: &str,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .hashes
            .insert(key.to_string(), fields.into_iter().collect());
        inner
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn delete_record(&self, key: &str, set: &str, member: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.hashes.remove(key);
        if let Some(s) = inner.sets.get_mut(set) {
            s.remove(member);
        }
        Ok(())
    }

    async fn unindex_if_missing(&self, key: &str, set: &str, member: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.hashes.contains_key(key) {
            return Ok(false);
        }
        Ok(inner.sets.get_mut(set).is_some_and(|s| s.remove(member)))
    }

    async fn drop_if_unindexed(&self, key: &str, set: &str, member: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.sets.get(set).is_some_and(|s| s.contains(member)) {
            return Ok(false);
        }
        Ok(inner.hashes.remove(key).is_some())
    }
}
