// src/state.rs

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ProductCache;
use crate::form::FormRegistry;
use crate::storage::BlobStorage;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStorage>,
    pub product_cache: ProductCache,
    pub forms: FormRegistry,
    pub shell_template: PathBuf,
}
