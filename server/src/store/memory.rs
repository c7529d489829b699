use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{register, RecordStore, Result};
use crate::models::{Attendee, NewAttendee};

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Attendee>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, submission: NewAttendee) -> Result<Attendee> {
        let attendee = register(submission);
        self.records.write().await.push(attendee.clone());
        Ok(attendee)
    }

    async fn list_all(&self) -> Result<Vec<Attendee>> {
        Ok(self.records.read().await.clone())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|attendee| attendee.id != id);
        Ok(records.len() != before)
    }
}
