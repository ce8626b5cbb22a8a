// src/handlers.rs

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::form::{FormHandle, lock_form};
use crate::mode::FormMode;
use crate::models::DraftField;
use crate::notify::{LISTING_PATH, Toast, insert_location, insert_toasts};
use crate::response::build_response;
use crate::save::submit_form;
use crate::state::AppState;
use crate::storage::{ProgressFn, object_key};
use crate::views::{render_product_form, render_product_list, render_upload_status};

/// Wejście na ekran: `ADD` otwiera dodawanie, identyfikator produktu otwiera edycję.
pub async fn product_form_page(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    tracing::info!("Obsłużono zapytanie GET /admin/add-product/{}", id);
    let mode = FormMode::resolve(&id, &app_state.product_cache).await?;
    let (form_id, handle) = app_state.forms.open(mode).await;

    let markup = {
        let form = lock_form(&handle)?;
        render_product_form(form_id, &form)
    };
    build_response(&headers, &app_state.shell_template, markup).await
}

/// Nakłada przesłane pola na szkic. Nieznane pola i `imageURL` są pomijane.
fn apply_fields(handle: &FormHandle, fields: &HashMap<String, String>) -> Result<(), AppError> {
    let mut form = lock_form(handle)?;
    for (name, value) in fields {
        match DraftField::from_str(name) {
            Ok(DraftField::ImageUrl) => {
                tracing::warn!("Pominięto próbę ręcznej zmiany imageURL");
            }
            Ok(field) => form.apply_change(field, value.clone()),
            Err(_) => tracing::debug!("Pominięto nieznane pole formularza: {}", name),
        }
    }
    Ok(())
}

pub async fn field_change_handler(
    State(app_state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let handle = app_state.forms.get(form_id).await?;
    apply_fields(&handle, &fields)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn image_upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let handle = app_state.forms.get(form_id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "image".to_string());
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| AppError::BadRequest("No image file was selected.".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "The selected image file is empty.".to_string(),
        ));
    }

    let key = object_key(Utc::now().timestamp_millis(), &file_name);
    let ticket = lock_form(&handle)?.begin_upload(key.clone())?;
    tracing::info!(
        "Start wysyłki obrazu '{}' ({} bajtów) dla formularza {}",
        key,
        bytes.len(),
        form_id
    );

    let progress_handle = handle.clone();
    let progress: ProgressFn = Arc::new(move |sent, total| {
        if let Ok(mut form) = progress_handle.lock() {
            form.upload_progressed(ticket, sent, total);
        }
    });

    let blobs = app_state.blobs.clone();
    let task_handle = handle.clone();
    tokio::spawn(async move {
        let result = blobs.upload(&key, bytes, progress).await;
        match task_handle.lock() {
            Ok(mut form) => form.upload_finished(ticket, result),
            Err(_) => tracing::error!("Zatruty mutex formularza po wysyłce '{}'", key),
        }
    });

    progress_response(form_id, &handle)
}

pub async fn upload_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = app_state.forms.get(form_id).await?;
    progress_response(form_id, &handle)
}

fn progress_response(form_id: Uuid, handle: &FormHandle) -> Result<Response, AppError> {
    let mut form = lock_form(handle)?;
    let markup = render_upload_status(form_id, &form);
    let notices = form.take_notices();
    drop(form);

    let mut headers = HeaderMap::new();
    insert_toasts(&mut headers, &notices);
    Ok((headers, markup).into_response())
}

pub async fn submit_handler(
    State(app_state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    tracing::info!("Obsłużono zapytanie POST /admin/forms/{}/submit", form_id);
    let handle = app_state.forms.get(form_id).await?;
    apply_fields(&handle, &fields)?;

    let report = submit_form(
        &handle,
        app_state.records.as_ref(),
        app_state.blobs.as_ref(),
        &app_state.product_cache,
    )
    .await?;

    // Po zapisie ekran przechodzi do listy, szkic przestaje istnieć
    app_state.forms.close(form_id).await;

    let mut headers = HeaderMap::new();
    insert_toasts(&mut headers, &report.notices);
    insert_location(&mut headers, LISTING_PATH);
    Ok((StatusCode::OK, headers).into_response())
}

pub async fn list_products_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let products = app_state.product_cache.snapshot();
    tracing::debug!("Lista produktów: {} pozycji", products.len());
    build_response(
        &headers,
        &app_state.shell_template,
        render_product_list(&products),
    )
    .await
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Fallback dla nieznanych tras, z toastem jak w pozostałych błędach.
pub async fn not_found_handler() -> Response {
    let mut headers = HeaderMap::new();
    Toast::error("Page not found.").insert_into(&mut headers);
    (StatusCode::NOT_FOUND, headers, "Not found").into_response()
}
