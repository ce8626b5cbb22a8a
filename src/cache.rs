// src/cache.rs

use moka::future::Cache;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Product;
use crate::store::RecordStore;

/// Załadowana w pamięci kolekcja produktów. Z niej formularz edycji bierze rekord wyjściowy.
///
/// Cache nie ma limitu pojemności ani wygasania: musi trzymać każdy zapisany produkt,
/// inaczej lista i wejście w edycję gubiłyby istniejące rekordy.
#[derive(Clone)]
pub struct ProductCache {
    inner: Cache<Uuid, Product>,
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Wczytuje wszystkie produkty z magazynu rekordów.
    pub async fn warm(&self, store: &dyn RecordStore) -> Result<usize, AppError> {
        let products = store.list().await?;
        for product in products {
            self.inner.insert(product.id, product).await;
        }
        self.inner.run_pending_tasks().await;
        let count = self.inner.entry_count() as usize;
        tracing::info!("Cache produktów załadowany: {} rekordów", count);
        Ok(count)
    }

    pub async fn get(&self, id: Uuid) -> Option<Product> {
        self.inner.get(&id).await
    }

    pub async fn insert(&self, product: Product) {
        self.inner.insert(product.id, product).await;
    }

    /// Produkty posortowane od najnowszego.
    pub fn snapshot(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.inner.iter().map(|(_, p)| p).collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products
    }
}
