use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lol_html::{HtmlRewriter, Settings, element};
use maud::Markup;
use tokio::fs;
use tokio_util::bytes::Bytes;

use crate::errors::AppError;

/// Wczytuje szablon HTML i wstawia treść w miejsce `#content`.
/// Usuwa atrybuty HTMX inicjujące ładowanie, żeby htmx nie nadpisał treści po załadowaniu strony.
async fn serve_full_page(shell_path: &Path, content_markup: Markup) -> Result<Response, AppError> {
    let shell_content = match fs::read(shell_path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            tracing::error!(
                "Nie można wczytać pliku szablonu {}: {}",
                shell_path.display(),
                e
            );
            return Err(AppError::InternalServerError(
                "Could not load the page template.".to_string(),
            ));
        }
    };

    let content_string = content_markup.into_string();
    let mut response_body = Vec::new();

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("#content", |el| {
                el.set_inner_content(&content_string, lol_html::html_content::ContentType::Html);
                el.remove_attribute("hx-trigger");
                el.remove_attribute("hx-get");
                Ok(())
            })],
            ..Settings::default()
        },
        |c: &[u8]| response_body.extend_from_slice(c),
    );

    rewriter.write(&shell_content).map_err(|e| {
        tracing::error!("Błąd przetwarzania szablonu: {}", e);
        AppError::InternalServerError("Could not render the page.".to_string())
    })?;
    rewriter.end().map_err(|e| {
        tracing::error!("Błąd przetwarzania szablonu: {}", e);
        AppError::InternalServerError("Could not render the page.".to_string())
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(response_body))
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Dla żądań HTMX zwraca sam fragment, dla pełnego odświeżenia (F5) całą stronę.
pub async fn build_response(
    headers: &HeaderMap,
    shell_path: &Path,
    page_content: Markup,
) -> Result<Response, AppError> {
    if headers.contains_key("HX-Request") {
        Ok(page_content.into_response())
    } else {
        serve_full_page(shell_path, page_content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maud::html;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn htmx_requests_get_the_fragment_only() {
        let mut headers = HeaderMap::new();
        headers.insert("HX-Request", "true".parse().unwrap());
        let response = build_response(&headers, Path::new("does/not/exist.html"), html! { p { "frag" } })
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "<p>frag</p>");
    }

    #[tokio::test]
    async fn full_page_injects_content_into_shell() {
        let response = build_response(
            &HeaderMap::new(),
            Path::new("static/index.html"),
            html! { p #marker { "frag" } },
        )
        .await
        .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("<p id=\"marker\">frag</p>"));
        assert!(body.contains("<html"));
    }

    #[tokio::test]
    async fn missing_shell_is_an_internal_error() {
        let err = build_response(&HeaderMap::new(), Path::new("does/not/exist.html"), html! {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalServerError(_)));
    }
}
