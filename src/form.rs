// src/form.rs

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mode::FormMode;
use crate::models::{DraftField, ProductDraft};
use crate::notify::Toast;
use crate::upload::{UploadState, UploadTicket, UploadTracker};

/// Stan jednego otwartego ekranu dodawania/edycji produktu.
#[derive(Debug)]
pub struct ProductForm {
    mode: FormMode,
    draft: ProductDraft,
    upload: UploadTracker,
    is_loading: bool,
    notices: Vec<Toast>,
}

/// Migawka szkicu zabrana do zapisu.
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    pub mode: FormMode,
    pub draft: ProductDraft,
}

impl ProductForm {
    pub fn new(mode: FormMode) -> Self {
        let draft = mode.initial_draft();
        Self {
            mode,
            draft,
            upload: UploadTracker::default(),
            is_loading: false,
            notices: Vec::new(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    pub fn upload_state(&self) -> &UploadState {
        self.upload.state()
    }

    pub fn upload_progress(&self) -> f64 {
        self.upload.progress()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn apply_change(&mut self, field: DraftField, value: impl Into<String>) {
        self.draft = self.draft.with_field(field, value);
    }

    pub fn begin_upload(&mut self, key: String) -> Result<UploadTicket, AppError> {
        self.upload.start(key.clone()).ok_or_else(|| {
            tracing::warn!("Odrzucono wysyłkę '{}': poprzednia jeszcze trwa", key);
            AppError::Conflict("An image upload is already in progress.".to_string())
        })
    }

    pub fn upload_progressed(&mut self, ticket: UploadTicket, sent: u64, total: u64) {
        if self.upload.report(ticket, sent, total) {
            tracing::debug!("Postęp wysyłki: {:.0}%", self.upload.progress());
        }
    }

    pub fn upload_finished(&mut self, ticket: UploadTicket, result: Result<String, AppError>) {
        match result {
            Ok(url) => {
                if self.upload.complete(ticket, url.clone()) {
                    self.draft = self.draft.with_field(DraftField::ImageUrl, url);
                    self.notices.push(Toast::success("Image uploaded successfully."));
                } else {
                    tracing::warn!("Wysyłka zakończona po porzuceniu, obraz osierocony: {}", url);
                }
            }
            Err(e) => {
                let message = e.user_message();
                if self.upload.fail(ticket, message.clone()) {
                    tracing::error!("Wysyłka obrazu nie powiodła się: {}", message);
                    self.notices.push(Toast::error(message));
                }
            }
        }
    }

    /// Ustawia flagę ładowania i zwraca migawkę do zapisu.
    pub fn begin_submit(&mut self) -> Result<PendingSubmit, AppError> {
        if self.is_loading {
            return Err(AppError::Conflict(
                "The product is already being saved.".to_string(),
            ));
        }
        self.is_loading = true;
        Ok(PendingSubmit {
            mode: self.mode.clone(),
            draft: self.draft.clone(),
        })
    }

    /// Po udanym utworzeniu formularz wraca do pustego szkicu i zerowego postępu.
    pub fn finish_create(&mut self) {
        self.is_loading = false;
        self.draft = ProductDraft::empty();
        self.upload.reset();
    }

    /// Po udanej edycji szkic zostaje, ekran i tak przechodzi do listy.
    /// Wysyłka, która jeszcze trwa, zostaje osierocona.
    pub fn finish_edit(&mut self) {
        self.is_loading = false;
        self.upload.reset();
    }

    pub fn abort_submit(&mut self) {
        self.is_loading = false;
    }

    pub fn take_notices(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.notices)
    }
}

pub type FormHandle = Arc<Mutex<ProductForm>>;

pub fn lock_form(handle: &FormHandle) -> Result<MutexGuard<'_, ProductForm>, AppError> {
    handle.lock().map_err(|_| {
        tracing::error!("Zatruty mutex formularza");
        AppError::InternalServerError("The form is unavailable, please reload the page.".to_string())
    })
}

/// Otwarte formularze. Wpis znika po czasie bezczynności (porzucenie ekranu).
#[derive(Clone)]
pub struct FormRegistry {
    forms: Cache<Uuid, FormHandle>,
}

impl FormRegistry {
    pub fn new(max_forms: u64, idle: Duration) -> Self {
        Self {
            forms: Cache::builder()
                .max_capacity(max_forms)
                .time_to_idle(idle)
                .build(),
        }
    }

    pub async fn open(&self, mode: FormMode) -> (Uuid, FormHandle) {
        let form_id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(ProductForm::new(mode)));
        self.forms.insert(form_id, handle.clone()).await;
        tracing::info!("Otwarto formularz produktu {}", form_id);
        (form_id, handle)
    }

    pub async fn get(&self, form_id: Uuid) -> Result<FormHandle, AppError> {
        self.forms.get(&form_id).await.ok_or_else(|| {
            tracing::warn!("Nieznany lub wygasły formularz: {}", form_id);
            AppError::NotFound
        })
    }

    /// Zamyka formularz po nawigacji do listy.
    pub async fn close(&self, form_id: Uuid) {
        self.forms.invalidate(&form_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_completion_merges_url_into_current_draft() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        // zmiana pola w trakcie wysyłki nie może zostać nadpisana
        form.apply_change(DraftField::Name, "Laptop X");
        form.upload_finished(ticket, Ok("https://img/1a.jpg".into()));

        assert_eq!(form.draft().name, "Laptop X");
        assert_eq!(form.draft().image_url, "https://img/1a.jpg");
        assert_eq!(form.upload_progress(), 100.0);
        assert_eq!(
            form.take_notices(),
            vec![Toast::success("Image uploaded successfully.")]
        );
        assert!(form.take_notices().is_empty());
    }

    #[test]
    fn upload_failure_notifies_and_keeps_draft() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        form.upload_progressed(ticket, 1, 4);
        form.upload_finished(ticket, Err(AppError::Storage("quota".into())));

        assert_eq!(form.draft().image_url, "");
        assert_eq!(form.upload_progress(), 25.0);
        assert_eq!(form.take_notices(), vec![Toast::error("quota")]);
    }

    #[test]
    fn second_upload_is_rejected_while_first_runs() {
        let mut form = ProductForm::new(FormMode::Create);
        form.begin_upload("images/1a.jpg".into()).unwrap();
        let err = form.begin_upload("images/2b.jpg".into()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn double_submit_is_rejected_until_finished() {
        let mut form = ProductForm::new(FormMode::Create);
        form.begin_submit().unwrap();
        assert!(form.is_loading());
        assert!(matches!(form.begin_submit(), Err(AppError::Conflict(_))));
        form.abort_submit();
        assert!(!form.is_loading());
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn finish_create_resets_draft_and_progress() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        form.upload_finished(ticket, Ok("https://img/1a.jpg".into()));
        form.apply_change(DraftField::Price, "10");
        form.begin_submit().unwrap();
        form.finish_create();

        assert_eq!(form.draft(), &ProductDraft::empty());
        assert_eq!(form.upload_progress(), 0.0);
        assert!(!form.is_loading());
    }

    #[test]
    fn upload_landing_after_edit_save_is_orphaned() {
        let original = crate::models::Product {
            id: Uuid::new_v4(),
            name: "Kurtka".into(),
            image_url: "https://img/old.jpg".into(),
            price: 120.0,
            category: crate::models::Category::Fashion,
            brand: "Levi's".into(),
            description: "jeansowa".into(),
            created_at: chrono::Utc::now(),
            edited_at: None,
        };
        let mut form = ProductForm::new(FormMode::Edit {
            id: original.id,
            original: Box::new(original),
        });
        let ticket = form.begin_upload("images/1late.jpg".into()).unwrap();
        form.begin_submit().unwrap();
        form.finish_edit();

        form.upload_finished(ticket, Ok("https://img/1late.jpg".into()));
        assert_eq!(form.draft().image_url, "https://img/old.jpg");
        assert!(form.take_notices().is_empty());
        assert!(!form.upload_state().is_in_flight());
    }

    #[tokio::test]
    async fn registry_open_get_close() {
        let registry = FormRegistry::new(10, Duration::from_secs(60));
        let (id, _handle) = registry.open(FormMode::Create).await;
        assert!(registry.get(id).await.is_ok());
        registry.close(id).await;
        assert!(matches!(registry.get(id).await, Err(AppError::NotFound)));
    }
}
