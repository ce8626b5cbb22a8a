//! Konfiguracja z zmiennych środowiskowych (`.env` wczytuje `dotenvy` w `main`).
//!
//! - `DATABASE_URL` - Postgres; bez niej produkty trzymane są w pamięci
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` - wszystkie trzy albo żadna;
//!   bez nich obrazy trzymane są w pamięci
//! - `BIND_ADDR` - adres nasłuchu (domyślnie `0.0.0.0:3000`)
//! - `SHELL_TEMPLATE` - szablon strony (domyślnie `static/index.html`)
//! - `FORM_IDLE_MINUTES` - po ilu minutach bezczynności porzucony formularz znika (domyślnie 30)
//! - `MAX_UPLOAD_MB` - limit rozmiaru żądania (domyślnie 20)

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SHELL_TEMPLATE: &str = "static/index.html";
const DEFAULT_FORM_IDLE_MINUTES: u64 = 30;
const DEFAULT_MAX_UPLOAD_MB: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Brak zmiennej środowiskowej: {0}")]
    MissingEnvVar(String),
    #[error("Nieprawidłowa wartość zmiennej {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub bind_addr: SocketAddr,
    pub shell_template: PathBuf,
    pub form_idle: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Wersja niezależna od procesu, żeby dało się ją testować bez `set_var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            (cloud_name, api_key, _) => {
                let missing = if cloud_name.is_none() {
                    "CLOUDINARY_CLOUD_NAME"
                } else if api_key.is_none() {
                    "CLOUDINARY_API_KEY"
                } else {
                    "CLOUDINARY_API_SECRET"
                };
                return Err(ConfigError::MissingEnvVar(missing.to_string()));
            }
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BIND_ADDR".to_string(), e.to_string()))?;

        let form_idle_minutes = parse_or(&get, "FORM_IDLE_MINUTES", DEFAULT_FORM_IDLE_MINUTES)?;
        let max_upload_mb = parse_or(&get, "MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;

        Ok(Self {
            database_url: get("DATABASE_URL"),
            cloudinary,
            bind_addr,
            shell_template: PathBuf::from(
                get("SHELL_TEMPLATE").unwrap_or_else(|| DEFAULT_SHELL_TEMPLATE.to_string()),
            ),
            form_idle: Duration::from_secs(form_idle_minutes * 60),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
