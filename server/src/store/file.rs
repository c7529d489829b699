use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::codec::{self, HEADER};
use super::{register, RecordStore, Result, StoreError};
use crate::models::{Attendee, NewAttendee};

/// Flat-file store: one header line followed by one line per record.
///
/// Operations in this process are serialized, so a delete rewrite never
/// drops a concurrent append. Other processes writing the same file are not
/// coordinated with.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self) -> impl Fn(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::io(&self.path, source)
    }

    /// Creates the file with its header when it is missing or empty.
    async fn ensure_initialized(&self) -> Result<()> {
        match fs::metadata(&self.path).await {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&self.path, e)),
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::io(parent, source))?;
            }
        }

        fs::write(&self.path, format!("{HEADER}\n"))
            .await
            .map_err(self.io_error())?;
        info!(path = %self.path.display(), "Initialized registrations file");
        Ok(())
    }

    async fn read_records(&self) -> Result<Vec<Attendee>> {
        let bytes = fs::read(&self.path).await.map_err(self.io_error())?;
        // Invalid UTF-8 degrades the affected row, not the whole file
        let text = String::from_utf8_lossy(&bytes);
        Ok(codec::decode_document(&text))
    }

    /// Writes the full document beside the target and renames it into place.
    async fn rewrite(&self, records: &[Attendee]) -> Result<()> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, codec::encode_document(records))
            .await
            .map_err(|source| StoreError::io(&tmp_path, source))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(self.io_error())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn append(&self, submission: NewAttendee) -> Result<Attendee> {
        let _guard = self.lock.lock().await;
        self.ensure_initialized().await?;

        let attendee = register(submission);
        let mut line = codec::encode_record(&attendee);
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(self.io_error())?;
        file.write_all(line.as_bytes())
            .await
            .map_err(self.io_error())?;
        file.flush().await.map_err(self.io_error())?;

        debug!(id = %attendee.id, "Appended registration");
        Ok(attendee)
    }

    async fn list_all(&self) -> Result<Vec<Attendee>> {
        let _guard = self.lock.lock().await;
        self.ensure_initialized().await?;
        self.read_records().await
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        self.ensure_initialized().await?;

        let mut records = self.read_records().await?;
        let before = records.len();
        records.retain(|attendee| attendee.id != id);
        let removed = records.len() != before;

        self.rewrite(&records).await?;

        debug!(id = %id, removed, remaining = records.len(), "Rewrote registrations file");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, SubsecRound, Utc};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("data").join("registrations.csv"))
    }

    #[tokio::test]
    async fn test_missing_file_is_initialized_with_header() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.list_all().await.unwrap().is_empty());

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, format!("{HEADER}\n"));
    }

    #[tokio::test]
    async fn test_empty_file_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registrations.csv");
        std::fs::write(&path, "").unwrap();
        let store = FileStore::new(&path);

        store
            .append(NewAttendee::new("A", "a@x.com", "", true))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("{HEADER}\n")));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_then_list() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let before = Utc::now().trunc_subsecs(3);

        let created = store
            .append(NewAttendee::new("Alice", "a@x.com", "555", false))
            .await
            .unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(created.name, "Alice");
        assert_eq!(created.email, "a@x.com");
        assert_eq!(created.phone, "555");
        assert!(!created.consent);

        let at = DateTime::parse_from_rfc3339(&created.registered_at).unwrap();
        assert!(at >= before);
    }

    #[tokio::test]
    async fn test_embedded_comma_and_quote_survive() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store
            .append(NewAttendee::new("Alice, B.", "a@x.com", "", true))
            .await
            .unwrap();
        store
            .append(NewAttendee::new(
                "Bob \"Bee\" Jones",
                "b@x.com",
                "555-1234",
                false,
            ))
            .await
            .unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Alice, B.");
        assert!(listed[0].consent);
        assert_eq!(listed[1].name, "Bob \"Bee\" Jones");
        assert_eq!(listed[1].phone, "555-1234");
        assert!(!listed[1].consent);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_in_order() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let mut created = Vec::new();
        for name in ["A", "B, with comma", "C\nmultiline", "D"] {
            created.push(
                store
                    .append(NewAttendee::new(name, "x@x.com", "", true))
                    .await
                    .unwrap(),
            );
        }

        assert!(store.delete_by_id(&created[1].id).await.unwrap());

        let listed = store.list_all().await.unwrap();
        let expected: Vec<_> = created
            .iter()
            .filter(|a| a.id != created[1].id)
            .cloned()
            .collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_file_unchanged() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store
            .append(NewAttendee::new("Alice, B.", "a@x.com", "", true))
            .await
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        assert!(!store.delete_by_id("nonexistent").await.unwrap());

        let after = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(before, after);
        assert_eq!(after.matches(HEADER).count(), 1);
    }

    #[tokio::test]
    async fn test_delete_on_missing_file_initializes() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        assert!(!store.delete_by_id("nonexistent").await.unwrap());
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, format!("{HEADER}\n"));
    }

    #[tokio::test]
    async fn test_corrupt_row_does_not_hide_or_erase_later_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registrations.csv");
        std::fs::write(
            &path,
            format!(
                "{HEADER}\n1,\"Broken,a@x.com,,true,ts\n2,B,b@x.com,,true,ts\n3,C,c@x.com,,false,ts\n"
            ),
        )
        .unwrap();
        let store = FileStore::new(&path);

        let names = |records: Vec<Attendee>| -> Vec<String> {
            records.into_iter().map(|a| a.name).collect()
        };
        assert_eq!(names(store.list_all().await.unwrap()), ["B", "C"]);

        store
            .append(NewAttendee::new("Dan", "d@x.com", "", true))
            .await
            .unwrap();
        assert_eq!(names(store.list_all().await.unwrap()), ["B", "C", "Dan"]);

        assert!(!store.delete_by_id("nonexistent").await.unwrap());
        assert_eq!(names(store.list_all().await.unwrap()), ["B", "C", "Dan"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_degrades_only_the_affected_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registrations.csv");
        let mut bytes = format!("{HEADER}\n1,A").into_bytes();
        bytes.push(0xff);
        bytes.extend_from_slice(b"x,a@x.com,,true,ts\n2,B,b@x.com,,false,ts\n");
        std::fs::write(&path, bytes).unwrap();
        let store = FileStore::new(&path);

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "A\u{fffd}x");
        assert_eq!(listed[1].name, "B");
    }

    #[tokio::test]
    async fn test_concurrent_appends_and_deletes_lose_nothing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let doomed = store
            .append(NewAttendee::new("doomed", "d@x.com", "", true))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .append(NewAttendee::new(format!("n{i}"), "x@x.com", "", true))
                    .await
                    .unwrap();
            }));
        }
        let deleter = {
            let store = Arc::clone(&store);
            let id = doomed.id.clone();
            tokio::spawn(async move { store.delete_by_id(&id).await.unwrap() })
        };
        for task in tasks {
            task.await.unwrap();
        }
        assert!(deleter.await.unwrap());

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 16);
        assert!(listed.iter().all(|a| a.id != doomed.id));
    }

    #[tokio::test]
    async fn test_unwritable_location_surfaces_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let store = FileStore::new(blocker.join("registrations.csv"));

        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
