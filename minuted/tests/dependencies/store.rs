use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use minuted::model::{GlossaryTerm, MeetingRecord, RecordKey, RecordUpdate, Status};
use minuted::{BlobStore, Error, GlossaryStore, RecordStore};

/// In-memory record table with the same conditional-update semantics as the
/// real store. Every update's key is logged so tests can check which
/// creation instant each write addressed.
pub struct FakeRecordStore {
    records: Mutex<HashMap<(String, String), MeetingRecord>>,
    update_keys: Mutex<Vec<RecordKey>>,
}

impl FakeRecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeRecordStore {
            records: Mutex::new(HashMap::new()),
            update_keys: Mutex::new(Vec::new()),
        })
    }

    pub fn insert(&self, record: MeetingRecord) {
        let _ = self
            .records
            .lock()
            .unwrap()
            .insert((record.meeting_id.clone(), record.created_at.clone()), record);
    }

    /// Most recent record for a meeting id, outside the port.
    pub fn latest(&self, meeting_id: &str) -> Option<MeetingRecord> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.meeting_id == meeting_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Keys addressed by every `update` call, in order.
    pub fn update_keys(&self) -> Vec<RecordKey> {
        self.update_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<MeetingRecord>, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(key.meeting_id.clone(), key.created_at.clone()))
            .cloned())
    }

    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<MeetingRecord>, Error> {
        Ok(self.latest(meeting_id))
    }

    async fn find_by_status(
        &self,
        status: Status,
        s3_key: &str,
    ) -> Result<Option<MeetingRecord>, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.status == status && r.s3_key == s3_key)
            .cloned())
    }

    async fn put(&self, record: &MeetingRecord) -> Result<(), Error> {
        self.insert(record.clone());
        Ok(())
    }

    async fn update(&self, key: &RecordKey, update: RecordUpdate) -> Result<(), Error> {
        self.update_keys.lock().unwrap().push(key.clone());
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(key.meeting_id.clone(), key.created_at.clone()))
            .ok_or_else(|| Error::RecordNotFound(key.meeting_id.clone()))?;
        update.apply(record)
    }
}

/// In-memory blob store keyed by the exact keys `put` returns.
pub struct FakeBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeBlobStore {
            blobs: Mutex::new(HashMap::new()),
        })
    }

    pub fn insert(&self, key: &str, bytes: &[u8]) {
        let _ = self
            .blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::BlobError(format!("no such key: {key}")))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, Error> {
        let _ = self.blobs.lock().unwrap().insert(key.to_string(), bytes);
        Ok(key.to_string())
    }
}

/// Fixed glossary term set.
pub struct FakeGlossary {
    terms: Mutex<Vec<GlossaryTerm>>,
}

impl FakeGlossary {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeGlossary {
            terms: Mutex::new(Vec::new()),
        })
    }

    pub fn add(&self, term: &str, definition: &str) {
        self.terms.lock().unwrap().push(GlossaryTerm {
            term_id: term.to_lowercase(),
            term: term.to_string(),
            aliases: vec![],
            definition: definition.to_string(),
            created_at: None,
        });
    }
}

#[async_trait]
impl GlossaryStore for FakeGlossary {
    async fn scan_terms(&self) -> Result<Vec<GlossaryTerm>, Error> {
        Ok(self.terms.lock().unwrap().clone())
    }
}
