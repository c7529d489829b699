use std::sync::Arc;

use crate::config::Config;
use crate::store::{FileStore, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub export_file_prefix: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, export_file_prefix: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            export_file_prefix: export_file_prefix.into(),
        }
    }

    /// File-backed state at the configured data path.
    pub fn from_config(config: &Config) -> Self {
        let store = FileStore::new(config.data_path());
        Self::new(Arc::new(store), config.export_file_prefix.as_str())
    }
}
