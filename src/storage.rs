// src/storage.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::AppError;

/// Wywoływane z (przesłane_bajty, wszystkie_bajty) w trakcie wysyłki.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Rozmiar kawałka, w jakim pliki są strumieniowane (i raportowany postęp).
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Zewnętrzny magazyn obrazów.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Wysyła plik pod podanym kluczem i zwraca jego publiczny URL.
    async fn upload(&self, key: &str, bytes: Vec<u8>, progress: ProgressFn)
    -> Result<String, AppError>;

    /// Usuwa obraz wskazany publicznym URL-em.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

/// Klucz obiektu: `images/{milisekundy}{nazwa pliku}`.
///
/// Dwie wysyłki tego samego pliku w tej samej milisekundzie dostaną ten sam klucz.
pub fn object_key(now_millis: i64, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("images/{}{}", now_millis, sanitized)
}

/// Magazyn w pamięci, używany gdy nie skonfigurowano Cloudinary.
#[derive(Default)]
pub struct MemoryBlobStorage {
    base_url: String,
    objects: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: Mutex<Option<String>>,
    fail_deletes: Mutex<Option<String>>,
}

impl MemoryBlobStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn fail_uploads_with(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.fail_uploads.lock() {
            *slot = Some(message.into());
        }
    }

    pub fn fail_deletes_with(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.fail_deletes.lock() {
            *slot = Some(message.into());
        }
    }

    /// URL-e, dla których wywołano `delete`, w kolejności wywołań.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn stored(&self) -> Vec<String> {
        self.objects.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn failure(slot: &Mutex<Option<String>>) -> Option<String> {
        slot.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        progress: ProgressFn,
    ) -> Result<String, AppError> {
        let total = bytes.len() as u64;
        let mut sent = 0u64;
        for chunk in bytes.chunks(UPLOAD_CHUNK_SIZE) {
            sent += chunk.len() as u64;
            progress(sent, total);
            tokio::task::yield_now().await;
        }
        if let Some(message) = Self::failure(&self.fail_uploads) {
            return Err(AppError::Storage(message));
        }
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        if let Ok(mut objects) = self.objects.lock() {
            objects.push(url.clone());
        }
        tracing::debug!("Zapisano obraz w pamięci: {}", url);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(url.to_string());
        }
        if let Some(message) = Self::failure(&self.fail_deletes) {
            return Err(AppError::Storage(message));
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.retain(|u| u != url);
        }
        Ok(())
    }
}
