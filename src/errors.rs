use axum::{
    extract::multipart::MultipartError,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};

use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::notify::Toast;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Błąd SQLx: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Nie znaleziono zasobu")]
    NotFound,

    #[error("Błędy walidacji")]
    ValidationError(#[from] ValidationErrors),

    #[error("Nieprawidłowe dane wejściowe: {0}")]
    UnprocessableEntity(String),

    #[error("Wystąpił konflikt: {0}")]
    Conflict(String),

    #[error("Błąd magazynu obrazów: {0}")]
    Storage(String),

    #[error("Niepoprawne żądanie: {0}")]
    BadRequest(String),

    #[error("Wewnętrzny błąd serwera: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Komunikat przeznaczony dla użytkownika (toast).
    pub fn user_message(&self) -> String {
        match self {
            AppError::SqlxError(_) => "Could not save the product, please try again.".to_string(),
            AppError::NotFound => "Product not found.".to_string(),
            AppError::ValidationError(errors) => {
                let mut messages = Vec::new();
                for (field, field_errors) in errors.field_errors() {
                    for error in field_errors {
                        let msg = error.message.as_ref().map_or_else(
                            || format!("Field '{}' is invalid.", field),
                            |m| m.to_string(),
                        );
                        messages.push(msg);
                    }
                }
                messages.sort();
                messages.join(" ")
            }
            AppError::UnprocessableEntity(message)
            | AppError::Conflict(message)
            | AppError::Storage(message)
            | AppError::BadRequest(message)
            | AppError::InternalServerError(message) => message.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SqlxError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::UnprocessableEntity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::SqlxError(sqlx_error) = &self {
            tracing::error!("Błąd SQLx: {:?}", sqlx_error);
        }
        let status = self.status();
        let error_message = self.user_message();

        // htmx pokazuje toast z nagłówka HX-Trigger, także dla odpowiedzi 4xx/5xx
        let mut headers = HeaderMap::new();
        Toast::error(error_message.clone()).insert_into(&mut headers);

        let body = Json(json!({ "error": error_message }));
        (status, headers, body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        tracing::error!("Błąd przetwarzania Multipart: {:?}", err);
        AppError::UnprocessableEntity(format!("Could not read the submitted form: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Błąd sieci podczas komunikacji z serwerem obrazów: {:?}", err);
        AppError::Storage("Could not reach the image server.".to_string())
    }
}
