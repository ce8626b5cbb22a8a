// src/save.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::cache::ProductCache;
use crate::errors::AppError;
use crate::form::{FormHandle, lock_form};
use crate::mode::FormMode;
use crate::models::{Category, Product, ProductDraft, ProductRecord, ProductSubmission};
use crate::notify::Toast;
use crate::storage::BlobStorage;
use crate::store::RecordStore;

/// Zamienia tekstowy szkic na typy docelowe i waliduje go przed zapisem.
pub fn to_submission(draft: &ProductDraft) -> Result<ProductSubmission, AppError> {
    let price_str = draft.price.trim();
    if price_str.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Price is required.".to_string(),
        ));
    }
    let price: f64 = price_str
        .parse()
        .ok()
        .filter(|p: &f64| p.is_finite())
        .ok_or_else(|| {
            AppError::UnprocessableEntity("Price must be a number.".to_string())
        })?;
    let category = Category::from_str(draft.category.trim()).map_err(|_| {
        AppError::UnprocessableEntity(format!(
            "Unknown product category: {}",
            draft.category
        ))
    })?;

    let submission = ProductSubmission {
        name: draft.name.trim().to_string(),
        image_url: draft.image_url.clone(),
        price,
        category,
        brand: draft.brand.trim().to_string(),
        description: draft.desc.trim().to_string(),
    };
    submission.validate()?;
    Ok(submission)
}

fn record_from(
    submission: ProductSubmission,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
) -> ProductRecord {
    ProductRecord {
        name: submission.name,
        image_url: submission.image_url,
        price: submission.price,
        category: submission.category,
        brand: submission.brand,
        description: submission.description,
        created_at,
        edited_at,
    }
}

pub async fn create_product(
    records: &dyn RecordStore,
    draft: &ProductDraft,
    now: DateTime<Utc>,
) -> Result<Product, AppError> {
    let record = record_from(to_submission(draft)?, now, None);
    let id = records.create(&record).await?;
    Ok(record.into_product(id))
}

#[derive(Debug)]
pub struct EditOutcome {
    pub product: Product,
    /// `None` gdy obraz się nie zmienił; inaczej wynik usunięcia starego obrazu.
    pub image_cleanup: Option<Result<(), AppError>>,
}

/// Zastępuje rekord, zachowując `created_at`. Stary obraz jest usuwany dopiero po udanym zapisie.
pub async fn edit_product(
    records: &dyn RecordStore,
    blobs: &dyn BlobStorage,
    id: Uuid,
    original: &Product,
    draft: &ProductDraft,
    now: DateTime<Utc>,
) -> Result<EditOutcome, AppError> {
    let record = record_from(to_submission(draft)?, original.created_at, Some(now));
    records.replace(id, &record).await?;

    let image_cleanup = if record.image_url != original.image_url && !original.image_url.is_empty()
    {
        let result = blobs.delete(&original.image_url).await;
        if let Err(e) = &result {
            tracing::error!(
                "Nie udało się usunąć starego obrazu '{}' produktu {}: {}",
                original.image_url,
                id,
                e
            );
        }
        Some(result)
    } else {
        None
    };

    Ok(EditOutcome {
        product: record.into_product(id),
        image_cleanup,
    })
}

#[derive(Debug)]
pub struct SubmitReport {
    pub product: Product,
    pub notices: Vec<Toast>,
}

/// Zapis formularza: tworzenie albo edycja, zależnie od trybu ustalonego przy otwarciu.
pub async fn submit_form(
    handle: &FormHandle,
    records: &dyn RecordStore,
    blobs: &dyn BlobStorage,
    cache: &ProductCache,
) -> Result<SubmitReport, AppError> {
    let pending = {
        let mut form = lock_form(handle)?;
        form.begin_submit()?
    };
    let now = Utc::now();

    let result = match &pending.mode {
        FormMode::Create => create_product(records, &pending.draft, now)
            .await
            .map(|product| (product, vec![Toast::success("Product Uploaded Successfully!")])),
        FormMode::Edit { id, original } => {
            edit_product(records, blobs, *id, original, &pending.draft, now)
                .await
                .map(|outcome| {
                    let mut notices = vec![Toast::success("Product Edited Successfully!")];
                    if let Some(Err(e)) = outcome.image_cleanup {
                        notices.push(Toast::warning(format!(
                            "The previous image could not be removed: {}",
                            e.user_message()
                        )));
                    }
                    (outcome.product, notices)
                })
        }
    };

    let (product, notices) = {
        let mut form = lock_form(handle)?;
        match result {
            Ok(saved) => {
                match &pending.mode {
                    FormMode::Create => form.finish_create(),
                    FormMode::Edit { .. } => form.finish_edit(),
                }
                saved
            }
            Err(e) => {
                form.abort_submit();
                tracing::warn!("Zapis produktu nie powiódł się: {}", e);
                return Err(e);
            }
        }
    };

    cache.insert(product.clone()).await;
    tracing::info!("Zapisano produkt {} ({})", product.id, product.name);
    Ok(SubmitReport { product, notices })
}
