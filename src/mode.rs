// src/mode.rs

use uuid::Uuid;

use crate::cache::ProductCache;
use crate::errors::AppError;
use crate::models::{Product, ProductDraft};

/// Wartość parametru `{id}` otwierająca formularz dodawania.
pub const ADD_SENTINEL: &str = "ADD";

/// Tryb formularza, ustalany raz przy wejściu na ekran.
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Edit { id: Uuid, original: Box<Product> },
}

impl FormMode {
    /// Ustala tryb na podstawie parametru ścieżki. Produkt do edycji musi być w cache.
    pub async fn resolve(id_param: &str, cache: &ProductCache) -> Result<Self, AppError> {
        if id_param == ADD_SENTINEL {
            return Ok(FormMode::Create);
        }
        let id = Uuid::parse_str(id_param).map_err(|_| {
            tracing::warn!("Nieprawidłowy identyfikator produktu: '{}'", id_param);
            AppError::NotFound
        })?;
        let original = cache.get(id).await.ok_or(AppError::NotFound)?;
        Ok(FormMode::Edit {
            id,
            original: Box::new(original),
        })
    }

    /// Wybiera jedną z dwóch wartości zależnie od trybu.
    pub fn detect<T>(&self, create: T, edit: T) -> T {
        match self {
            FormMode::Create => create,
            FormMode::Edit { .. } => edit,
        }
    }

    pub fn initial_draft(&self) -> ProductDraft {
        match self {
            FormMode::Create => ProductDraft::empty(),
            FormMode::Edit { original, .. } => ProductDraft::from(original.as_ref()),
        }
    }

    pub fn title(&self) -> &'static str {
        self.detect("Add New Product", "Edit Product")
    }

    pub fn submit_label(&self) -> &'static str {
        self.detect("Save Product", "Edit Product")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{TimeZone, Utc};

    fn cached_product() -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "MacBook".into(),
            image_url: "https://img/mac.jpg".into(),
            price: 1299.0,
            category: Category::Laptop,
            brand: "Apple".into(),
            description: "13 cali".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn sentinel_selects_create_mode_with_empty_draft() {
        let cache = ProductCache::new();
        cache.insert(cached_product()).await;

        let mode = FormMode::resolve("ADD", &cache).await.unwrap();
        assert_eq!(mode, FormMode::Create);
        assert_eq!(mode.initial_draft(), ProductDraft::empty());
        assert_eq!(mode.title(), "Add New Product");
        assert_eq!(mode.submit_label(), "Save Product");
    }

    #[tokio::test]
    async fn known_id_selects_edit_mode_seeded_from_cache() {
        let cache = ProductCache::new();
        let product = cached_product();
        cache.insert(product.clone()).await;

        let mode = FormMode::resolve(&product.id.to_string(), &cache).await.unwrap();
        match &mode {
            FormMode::Edit { id, original } => {
                assert_eq!(*id, product.id);
                assert_eq!(original.as_ref(), &product);
            }
            FormMode::Create => panic!("expected edit mode"),
        }
        assert_eq!(mode.initial_draft(), ProductDraft::from(&product));
        assert_eq!(mode.title(), "Edit Product");
    }

    #[tokio::test]
    async fn sentinel_is_case_sensitive() {
        let cache = ProductCache::new();
        let err = FormMode::resolve("add", &cache).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let cache = ProductCache::new();
        let err = FormMode::resolve(&Uuid::new_v4().to_string(), &cache)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn detect_picks_by_variant() {
        let edit = FormMode::Edit {
            id: Uuid::nil(),
            original: Box::new(cached_product()),
        };
        assert_eq!(FormMode::Create.detect(1, 2), 1);
        assert_eq!(edit.detect(1, 2), 2);
    }
}
