// src/views.rs

use maud::{Markup, html};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::form::ProductForm;
use crate::mode::ADD_SENTINEL;
use crate::models::{Category, Product};
use crate::notify::LISTING_PATH;
use crate::upload::UploadState;

pub fn form_path(form_id: Uuid, action: &str) -> String {
    format!("/admin/forms/{}/{}", form_id, action)
}

fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

/// Pasek postępu (tylko po rozpoczęciu pierwszej wysyłki) i pole z URL-em obrazu.
pub fn render_upload_status(form_id: Uuid, form: &ProductForm) -> Markup {
    let state = form.upload_state();
    let progress = form.upload_progress();
    let image_url = &form.draft().image_url;
    let polling = state.is_in_flight();

    html! {
        div #upload-status
            hx-get=[polling.then(|| form_path(form_id, "progress"))]
            hx-trigger=[polling.then_some("every 500ms")]
            hx-swap=[polling.then_some("outerHTML")] {
            @if progress != 0.0 {
                div .progress {
                    div .progress-bar style=(format!("width: {:.0}%", progress)) {
                        @match state {
                            UploadState::Complete { .. } => { (format!("Upload Complete {:.0}%", progress)) }
                            UploadState::Failed { .. } => { (format!("Upload Failed {:.0}%", progress)) }
                            _ => { (format!("Uploading {:.0}%", progress)) }
                        }
                    }
                }
            }
            @if let UploadState::Failed { message, .. } = state {
                p .upload-error { (message) }
            }
            @if !image_url.is_empty() {
                input type="text" placeholder="Image URL" name="imageURL" value=(image_url) disabled;
            }
        }
    }
}

pub fn render_product_form(form_id: Uuid, form: &ProductForm) -> Markup {
    let mode = form.mode();
    let draft = form.draft();
    let field_url = form_path(form_id, "field");

    html! {
        @if form.is_loading() {
            div .loader-overlay { div .loader {} }
        }
        div #loader .htmx-indicator .loader-overlay { div .loader {} }
        div .product {
            h1 { (mode.title()) }
            div .card {
                form #product-form
                     hx-post=(form_path(form_id, "submit"))
                     hx-target="#product-form-messages"
                     hx-indicator="#loader" {
                    div #product-form-messages {}

                    label for="name" { "Product Name:" }
                    input type="text" id="name" placeholder="Product Name" name="name"
                          value=(draft.name) required
                          hx-post=(field_url) hx-trigger="change" hx-swap="none";

                    label { "Product Image:" }
                    div .card .group {
                        (render_upload_status(form_id, form))
                        input type="file" accept="image/*" placeholder="Product Image" name="image"
                              hx-post=(form_path(form_id, "image"))
                              hx-encoding="multipart/form-data"
                              hx-trigger="change"
                              hx-target="#upload-status"
                              hx-swap="outerHTML";
                    }

                    label for="price" { "Product Price:" }
                    input type="number" id="price" placeholder="Product Price" name="price"
                          value=(draft.price) required min="0" step="any"
                          hx-post=(field_url) hx-trigger="change" hx-swap="none";

                    label for="category" { "Product Category:" }
                    select id="category" name="category" required
                           hx-post=(field_url) hx-trigger="change" hx-swap="none" {
                        option value="" disabled selected[draft.category.is_empty()] {
                            "-- Choose Product Category --"
                        }
                        @for category in Category::iter() {
                            option value=(category.as_ref()) selected[draft.category == category.as_ref()] {
                                (category.to_string())
                            }
                        }
                    }

                    label for="brand" { "Product Brand:" }
                    input type="text" id="brand" placeholder="Product Brand" name="brand"
                          value=(draft.brand) required
                          hx-post=(field_url) hx-trigger="change" hx-swap="none";

                    label for="desc" { "Product Description" }
                    textarea id="desc" name="desc" required rows="10" cols="30"
                             hx-post=(field_url) hx-trigger="change" hx-swap="none" {
                        (draft.desc)
                    }

                    button type="submit" class="--btn --btn-primary" { (mode.submit_label()) }
                }
            }
        }
    }
}

pub fn render_product_list(products: &[Product]) -> Markup {
    html! {
        div .table {
            div .table-header {
                h2 { "All Products" }
                a href=(format!("/admin/add-product/{}", ADD_SENTINEL))
                  hx-get=(format!("/admin/add-product/{}", ADD_SENTINEL))
                  hx-target="#content" hx-push-url="true" {
                    "Add Product"
                }
            }
            @if products.is_empty() {
                p { "No product found." }
            } @else {
                table {
                    thead {
                        tr {
                            th { "s/n" }
                            th { "Image" }
                            th { "Name" }
                            th { "Category" }
                            th { "Brand" }
                            th { "Price" }
                            th { "Actions" }
                        }
                    }
                    tbody {
                        @for (index, product) in products.iter().enumerate() {
                            tr {
                                td { (index + 1) }
                                td {
                                    @if !product.image_url.is_empty() {
                                        img src=(product.image_url) alt=(product.name) style="width: 100px";
                                    }
                                }
                                td { (product.name) }
                                td { (product.category.to_string()) }
                                td { (product.brand) }
                                td { (format_price(product.price)) }
                                td {
                                    a href=(format!("/admin/add-product/{}", product.id))
                                      hx-get=(format!("/admin/add-product/{}", product.id))
                                      hx-target="#content" hx-push-url="true" {
                                        "Edit"
                                    }
                                }
                            }
                        }
                    }
                }
            }
            a href=(LISTING_PATH) hx-get=(LISTING_PATH) hx-target="#content" { "Refresh" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::FormMode;
    use crate::models::DraftField;

    #[test]
    fn progress_bar_is_hidden_until_first_upload() {
        let form = ProductForm::new(FormMode::Create);
        let html = render_upload_status(Uuid::nil(), &form).into_string();
        assert!(!html.contains("progress-bar"));
        assert!(!html.contains("imageURL"));
        assert!(!html.contains("every 500ms"));
    }

    #[test]
    fn in_flight_upload_polls_and_shows_percentage() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        form.upload_progressed(ticket, 1, 2);
        let html = render_upload_status(Uuid::nil(), &form).into_string();
        assert!(html.contains("Uploading 50%"));
        assert!(html.contains("every 500ms"));
    }

    #[test]
    fn completed_upload_shows_url_field() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        form.upload_finished(ticket, Ok("https://img/1a.jpg".into()));
        let html = render_upload_status(Uuid::nil(), &form).into_string();
        assert!(html.contains("Upload Complete 100%"));
        assert!(html.contains("https://img/1a.jpg"));
        assert!(!html.contains("every 500ms"));
    }

    #[test]
    fn failure_after_last_chunk_is_labelled_as_failed() {
        let mut form = ProductForm::new(FormMode::Create);
        let ticket = form.begin_upload("images/1a.jpg".into()).unwrap();
        form.upload_progressed(ticket, 4, 4);
        form.upload_finished(ticket, Err(crate::errors::AppError::Storage("Quota exceeded".into())));
        let html = render_upload_status(Uuid::nil(), &form).into_string();
        assert!(html.contains("Upload Failed 100%"));
        assert!(!html.contains("Uploading"));
        assert!(html.contains("Quota exceeded"));
    }

    #[test]
    fn create_form_uses_create_labels() {
        let mut form = ProductForm::new(FormMode::Create);
        form.apply_change(DraftField::Category, "Fashion");
        let html = render_product_form(Uuid::nil(), &form).into_string();
        assert!(html.contains("Add New Product"));
        assert!(html.contains("Save Product"));
        assert!(html.contains("<option value=\"Fashion\" selected>"));
    }
}
