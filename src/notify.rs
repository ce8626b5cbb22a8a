// src/notify.rs
//
// Powiadomienia (toasty) i nawigacja przekazywane do htmx przez nagłówki odpowiedzi.

use axum::http::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};

pub const LISTING_PATH: &str = "/admin/all-products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn insert_into(&self, headers: &mut HeaderMap) {
        insert_toasts(headers, std::slice::from_ref(self));
    }
}

/// JSON do nagłówka odpowiedzi. Przeglądarka czyta bajty nagłówka jako Latin-1,
/// więc znaki spoza ASCII idą jako sekwencje `\uXXXX`.
fn header_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Wstawia nagłówek `HX-Trigger` z ostatnim toastem z listy.
///
/// `showMessage` to jedno zdarzenie, więc przy kilku komunikatach
/// pozostałe są łączone w jedną treść.
pub fn insert_toasts(headers: &mut HeaderMap, toasts: &[Toast]) {
    let Some(last) = toasts.last() else {
        return;
    };
    let message = toasts
        .iter()
        .map(|t| t.message.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    // najpoważniejszy rodzaj wygrywa
    let kind = toasts
        .iter()
        .map(|t| t.kind)
        .max_by_key(|k| match k {
            ToastKind::Success => 0,
            ToastKind::Warning => 1,
            ToastKind::Error => 2,
        })
        .unwrap_or(last.kind);

    let toast_payload = json!({
        "showMessage": {
            "message": message,
            "type": kind,
        }
    });
    match HeaderValue::from_str(&header_json(&toast_payload)) {
        Ok(val) => {
            headers.insert("HX-Trigger", val);
        }
        Err(e) => {
            // nagłówki nie przyjmą np. znaków nowej linii
            tracing::warn!("Nie można utworzyć nagłówka HX-Trigger: {}", e);
        }
    }
}

/// Nawigacja typu "push" do widoku listy.
pub fn insert_location(headers: &mut HeaderMap, path: &str) {
    let location_payload = json!({
        "path": path,
        "target": "#content",
        "swap": "innerHTML"
    });
    if let Ok(val) = HeaderValue::from_str(&header_json(&location_payload)) {
        headers.insert("HX-Location", val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(headers: &HeaderMap, name: &str) -> serde_json::Value {
        let raw = headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("null");
        serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
    }

    #[test]
    fn single_toast_is_serialized_for_htmx() {
        let mut headers = HeaderMap::new();
        Toast::success("Product Uploaded Successfully!").insert_into(&mut headers);
        let value = header(&headers, "HX-Trigger");
        assert_eq!(value["showMessage"]["type"], "success");
        assert_eq!(value["showMessage"]["message"], "Product Uploaded Successfully!");
    }

    #[test]
    fn mixed_toasts_keep_the_most_severe_kind() {
        let mut headers = HeaderMap::new();
        insert_toasts(
            &mut headers,
            &[Toast::success("Saved."), Toast::warning("Old image kept.")],
        );
        let value = header(&headers, "HX-Trigger");
        assert_eq!(value["showMessage"]["type"], "warning");
        assert_eq!(value["showMessage"]["message"], "Saved. Old image kept.");
    }

    #[test]
    fn non_ascii_message_is_escaped_in_the_header() {
        let mut headers = HeaderMap::new();
        Toast::error("Zdjęcie usunięte 📷").insert_into(&mut headers);
        let raw = headers.get("HX-Trigger").map(|v| v.as_bytes().to_vec()).unwrap_or_default();
        assert!(raw.is_ascii());
        assert!(String::from_utf8_lossy(&raw).contains("\\u0119"));
        let value = header(&headers, "HX-Trigger");
        assert_eq!(value["showMessage"]["message"], "Zdjęcie usunięte 📷");
    }

    #[test]
    fn no_toasts_means_no_header() {
        let mut headers = HeaderMap::new();
        insert_toasts(&mut headers, &[]);
        assert!(headers.get("HX-Trigger").is_none());
    }

    #[test]
    fn location_points_at_listing() {
        let mut headers = HeaderMap::new();
        insert_location(&mut headers, LISTING_PATH);
        let value = header(&headers, "HX-Location");
        assert_eq!(value["path"], "/admin/all-products");
    }
}
