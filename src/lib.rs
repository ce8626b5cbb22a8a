// src/lib.rs

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod cloudinary;
pub mod config;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod mode;
pub mod models;
pub mod notify;
pub mod response;
pub mod save;
pub mod state;
pub mod storage;
pub mod store;
pub mod upload;
pub mod views;

use crate::handlers::*;
use crate::state::AppState;

/// Routing ekranu produktu.
pub fn build_router(app_state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/admin/add-product/{id}", get(product_form_page))
        .route("/admin/forms/{form_id}/field", post(field_change_handler))
        .route("/admin/forms/{form_id}/image", post(image_upload_handler))
        .route("/admin/forms/{form_id}/progress", get(upload_progress_handler))
        .route("/admin/forms/{form_id}/submit", post(submit_handler))
        .route("/admin/all-products", get(list_products_handler))
        .route("/health", get(health_handler))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(app_state)
}
