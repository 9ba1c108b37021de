use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use vigil_core::{EpisodeRecord, ProfileStore, RecordStore, SubjectProfile};

/// In-memory record store. Default for tests and dev deployments.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<HashMap<String, EpisodeRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, subject_id: &str) -> anyhow::Result<Option<EpisodeRecord>> {
        Ok(self.inner.read().await.get(subject_id).cloned())
    }

    async fn put(&self, subject_id: &str, record: &EpisodeRecord) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .insert(subject_id.to_string(), record.clone());
        Ok(())
    }
}

/// In-memory profile store, seeded at construction or via `insert`.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<HashMap<String, SubjectProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subject_id: &str, profile: SubjectProfile) {
        self.inner
            .write()
            .await
            .insert(subject_id.to_string(), profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, subject_id: &str) -> anyhow::Result<Option<SubjectProfile>> {
        Ok(self.inner.read().await.get(subject_id).cloned())
    }
}
