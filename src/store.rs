// src/store.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Product, ProductRecord};

/// Zewnętrzny magazyn rekordów produktów.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Tworzy rekord i zwraca nadany mu identyfikator.
    async fn create(&self, record: &ProductRecord) -> Result<Uuid, AppError>;

    /// Zastępuje cały rekord o podanym identyfikatorze.
    async fn replace(&self, id: Uuid, record: &ProductRecord) -> Result<(), AppError>;

    async fn list(&self) -> Result<Vec<Product>, AppError>;
}

// --- Postgres ---

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tworzy typ `product_category` i tabelę `products`, jeśli jeszcze nie istnieją.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DO $$ BEGIN
                CREATE TYPE product_category AS ENUM ('Laptop', 'Electronics', 'Fashion', 'Phone');
            EXCEPTION
                WHEN duplicate_object THEN NULL;
            END $$;
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                image_url TEXT NOT NULL DEFAULT '',
                price DOUBLE PRECISION NOT NULL,
                category product_category NOT NULL,
                brand TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                edited_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        tracing::info!("Schemat tabeli products gotowy");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, record: &ProductRecord) -> Result<Uuid, AppError> {
        let new_product_id = Uuid::new_v4();
        sqlx::query(
            r#"
                INSERT INTO products (id, name, image_url, price, category, brand, description, created_at, edited_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(new_product_id)
        .bind(&record.name)
        .bind(&record.image_url)
        .bind(record.price)
        .bind(record.category)
        .bind(&record.brand)
        .bind(&record.description)
        .bind(record.created_at)
        .bind(record.edited_at)
        .execute(&self.pool)
        .await?;
        tracing::info!("Utworzono produkt o ID: {}", new_product_id);
        Ok(new_product_id)
    }

    async fn replace(&self, id: Uuid, record: &ProductRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
                UPDATE products
                SET name = $1, image_url = $2, price = $3, category = $4, brand = $5,
                    description = $6, created_at = $7, edited_at = $8
                WHERE id = $9
            "#,
        )
        .bind(&record.name)
        .bind(&record.image_url)
        .bind(record.price)
        .bind(record.category)
        .bind(&record.brand)
        .bind(&record.description)
        .bind(record.created_at)
        .bind(record.edited_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("Nie znaleziono produktu do zastąpienia: {}", id);
            return Err(AppError::NotFound);
        }
        tracing::info!("Pomyślnie zaktualizowano produkt o ID: {}", id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, image_url, price, category, brand, description, created_at, edited_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }
}

// --- Pamięć procesu ---

/// Magazyn w pamięci, używany gdy nie skonfigurowano bazy danych.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<Uuid, ProductRecord>>,
    fail_writes: Mutex<Option<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kolejne zapisy będą kończyć się błędem (do testów ścieżek awarii).
    pub fn fail_writes_with(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.fail_writes.lock() {
            *slot = Some(message.into());
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Product> {
        let records = self.records.lock().ok()?;
        records.get(&id).cloned().map(|r| r.into_product(id))
    }

    fn check_writable(&self) -> Result<(), AppError> {
        let slot = self
            .fail_writes
            .lock()
            .map_err(|_| AppError::InternalServerError("Record store is unavailable.".to_string()))?;
        match slot.as_ref() {
            Some(message) => Err(AppError::InternalServerError(message.clone())),
            None => Ok(()),
        }
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, ProductRecord>>, AppError> {
        self.records
            .lock()
            .map_err(|_| AppError::InternalServerError("Record store is unavailable.".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, record: &ProductRecord) -> Result<Uuid, AppError> {
        self.check_writable()?;
        let id = Uuid::new_v4();
        self.records()?.insert(id, record.clone());
        tracing::debug!("Utworzono produkt w pamięci: {}", id);
        Ok(id)
    }

    async fn replace(&self, id: Uuid, record: &ProductRecord) -> Result<(), AppError> {
        self.check_writable()?;
        let mut records = self.records()?;
        match records.get_mut(&id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn list(&self) -> Result<Vec<Product>, AppError> {
        let records = self.records()?;
        Ok(records
            .iter()
            .map(|(id, r)| r.clone().into_product(*id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;

    fn record() -> ProductRecord {
        ProductRecord {
            name: "Kurtka".into(),
            image_url: String::new(),
            price: 120.0,
            category: Category::Fashion,
            brand: "Levi's".into(),
            description: "jeansowa".into(),
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn memory_store_create_then_replace() {
        let store = MemoryRecordStore::new();
        let id = store.create(&record()).await.unwrap();

        let mut changed = record();
        changed.price = 99.0;
        store.replace(id, &changed).await.unwrap();

        assert_eq!(store.get(id).map(|p| p.price), Some(99.0));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn memory_store_replace_unknown_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store.replace(Uuid::new_v4(), &record()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn memory_store_can_simulate_failures() {
        let store = MemoryRecordStore::new();
        store.fail_writes_with("baza niedostępna");
        let err = store.create(&record()).await.unwrap_err();
        assert_eq!(err.user_message(), "baza niedostępna");
    }
}
