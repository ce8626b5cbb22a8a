// src.cloudinary

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, multipart};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::CloudinaryConfig;
use crate::errors::AppError;
use crate::storage::{BlobStorage, ProgressFn, UPLOAD_CHUNK_SIZE};

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDeleteResponse {
    result: String,
}

pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    client: Client,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }
}

// Funkcja do ekstrakcji public_id z URL-a Cloudinary
pub fn extract_public_id_from_url(url: &str, cloud_name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if parsed.host_str() != Some("res.cloudinary.com") {
        tracing::warn!("URL '{}' nie pasuje do oczekiwanej bazy Cloudinary", url);
        return None;
    }
    let prefix = format!("/{}/image/upload/", cloud_name);
    let Some(remainder) = parsed.path().strip_prefix(&prefix) else {
        tracing::warn!("URL '{}' nie należy do chmury '{}'", url, cloud_name);
        return None;
    };

    // Usuwanie wersji (v1746734489/...)
    let path_after_version = match remainder.split_once('/') {
        Some((version, rest))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => remainder,
    };

    // Usuwanie rozszerzenia pliku
    let public_id = path_after_version
        .rsplit_once('.')
        .map_or(path_after_version, |(id, _)| id)
        .to_string();
    tracing::debug!("Wyodrębniony public_id: {:?}", public_id);
    if public_id.is_empty() {
        None
    } else {
        Some(public_id)
    }
}

/// Klucz obiektu bez rozszerzenia; Cloudinary dopisuje format sam.
pub fn public_id_for_key(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem.to_string(),
        _ => key.to_string(),
    }
}

/// Podpis żądania: posortowane parametry `k=v` złączone `&`, doklejony sekret, SHA-1 w hex.
pub fn sign_params(params: &BTreeMap<String, String>, api_secret: &str) -> String {
    let mut signature_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<String>>()
        .join("&");
    signature_string.push_str(api_secret);

    let mut hasher = Sha1::new();
    hasher.update(signature_string.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> Result<u64, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::InternalServerError("System clock error.".to_string()))?
        .as_secs())
}

#[async_trait]
impl BlobStorage for CloudinaryStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        progress: ProgressFn,
    ) -> Result<String, AppError> {
        let timestamp = unix_timestamp()?;
        let public_id = public_id_for_key(key);
        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();

        let mut params_to_sign = BTreeMap::new();
        params_to_sign.insert("public_id".to_string(), public_id.clone());
        params_to_sign.insert("timestamp".to_string(), timestamp.to_string());
        let signature = sign_params(&params_to_sign, &self.config.api_secret);

        // Plik idzie strumieniem w kawałkach, każdy wysłany kawałek to jedno powiadomienie o postępie
        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str("image/*")
            .map_err(|e| {
                tracing::error!("Błąd ustawiania typu MIME: {}", e);
                AppError::InternalServerError(
                    "Could not prepare the image for upload.".to_string(),
                )
            })?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("public_id", public_id)
            .text("timestamp", timestamp.to_string())
            .text("signature", signature);

        let resp = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Brak treści błędu".to_string());
            tracing::error!(
                "Błąd uploadu do Cloudinary: Status={}, Treść={}",
                status,
                error_text
            );
            return Err(AppError::Storage(format!(
                "Image upload failed (status: {})",
                status
            )));
        }

        let result = resp.json::<CloudinaryUploadResponse>().await.map_err(|e| {
            tracing::error!("Błąd deserializacji odpowiedzi Cloudinary: {}", e);
            AppError::Storage("Unexpected response from the image server.".to_string())
        })?;
        tracing::info!("Obraz przesłany do Cloudinary: {}", result.secure_url);
        Ok(result.secure_url)
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let public_id = extract_public_id_from_url(url, &self.config.cloud_name).ok_or_else(|| {
            AppError::Storage(format!("Not a recognised image URL: {}", url))
        })?;
        let timestamp = unix_timestamp()?;

        // Parametry do podpisu dla żądania typu 'destroy'
        let mut params_to_sign = BTreeMap::new();
        params_to_sign.insert("public_id".to_string(), public_id.clone());
        params_to_sign.insert("timestamp".to_string(), timestamp.to_string());
        let signature = sign_params(&params_to_sign, &self.config.api_secret);

        let mut form_params = params_to_sign;
        form_params.insert("api_key".to_string(), self.config.api_key.clone());
        form_params.insert("signature".to_string(), signature);

        tracing::debug!("Zbudowano żądanie usunięcia dla public_id: {}", public_id);
        let resp = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form_params)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Brak treści błędu".to_string());
            tracing::error!(
                "Błąd usuwania obrazu z Cloudinary (public_id: {}): Status={}, Treść={}",
                public_id,
                status,
                error_text
            );
            return Err(AppError::Storage(format!(
                "Could not delete the previous image (status: {})",
                status
            )));
        }

        let delete_api_response = resp.json::<CloudinaryDeleteResponse>().await.map_err(|e| {
            tracing::error!("Błąd deserializacji odpowiedzi usuwania z Cloudinary: {}", e);
            AppError::Storage(
                "Unexpected response from the image server.".to_string(),
            )
        })?;

        if delete_api_response.result == "ok" || delete_api_response.result == "not found" {
            tracing::info!(
                "Obraz o public_id '{}' usunięty z Cloudinary (lub nie znaleziono). Wynik: {}",
                public_id,
                delete_api_response.result
            );
            Ok(())
        } else {
            tracing::error!(
                "Cloudinary zwróciło nieoczekiwany wynik przy usuwaniu obrazu '{}': {}",
                public_id,
                delete_api_response.result
            );
            Err(AppError::Storage(format!(
                "Image server returned an unexpected result: {}",
                delete_api_response.result
            )))
        }
    }
}
