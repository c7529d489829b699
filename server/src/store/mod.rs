//! Persistence for attendee registrations.
//!
//! Callers talk to a [`RecordStore`]; [`FileStore`] keeps records in a single
//! delimited text file and [`MemoryStore`] keeps them in memory.

pub mod codec;
pub mod file;
pub mod memory;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Attendee, NewAttendee};

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assigns an id and timestamp to the submission and persists it.
    async fn append(&self, submission: NewAttendee) -> Result<Attendee>;

    /// Every stored record, in insertion order.
    async fn list_all(&self) -> Result<Vec<Attendee>>;

    /// Removes the record with `id`. Returns whether one was removed; a
    /// missing id is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<bool>;
}

/// Builds the stored form of a submission with a fresh id and timestamp.
pub fn register(submission: NewAttendee) -> Attendee {
    Attendee {
        id: Uuid::new_v4().to_string(),
        name: submission.name,
        email: submission.email,
        phone: submission.phone,
        consent: submission.consent,
        registered_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_register_assigns_unique_ids() {
        let a = register(NewAttendee::new("A", "a@x.com", "", true));
        let b = register(NewAttendee::new("A", "a@x.com", "", true));
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_register_timestamp_is_iso8601_utc() {
        let a = register(NewAttendee::new("A", "a@x.com", "", true));
        assert!(a.registered_at.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&a.registered_at).is_ok());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = StoreError::io(
            Path::new("data/registrations.csv"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("data/registrations.csv"));
    }
}
