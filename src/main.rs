// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_admin_form::build_router;
use product_admin_form::cache::ProductCache;
use product_admin_form::cloudinary::CloudinaryStorage;
use product_admin_form::config::AppConfig;
use product_admin_form::form::FormRegistry;
use product_admin_form::state::AppState;
use product_admin_form::storage::{BlobStorage, MemoryBlobStorage};
use product_admin_form::store::{MemoryRecordStore, PgRecordStore, RecordStore};

const MAX_OPEN_FORMS: u64 = 1_000;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Inicjalizacja systemu logowania (tracing)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "product_admin_form=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Inicjalizacja serwera...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Nieprawidłowa konfiguracja: {}", e);
            std::process::exit(1);
        }
    };

    // --- Magazyn rekordów ---
    let records: Arc<dyn RecordStore> = match &config.database_url {
        Some(database_url) => {
            let pool = match PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    tracing::info!("Pomyślnie połączono z bazą danych");
                    pool
                }
                Err(err) => {
                    tracing::error!("Nie można połączyć z bazą danych: {:?}", err);
                    std::process::exit(1);
                }
            };
            let store = PgRecordStore::new(pool);
            if let Err(e) = store.ensure_schema().await {
                tracing::error!("Nie można przygotować schematu: {}", e);
                std::process::exit(1);
            }
            Arc::new(store)
        }
        None => {
            tracing::warn!("Brak DATABASE_URL - produkty będą trzymane w pamięci");
            Arc::new(MemoryRecordStore::new())
        }
    };

    // --- Magazyn obrazów ---
    let blobs: Arc<dyn BlobStorage> = match &config.cloudinary {
        Some(cloudinary_config) => {
            tracing::info!("Cloudinary: {:?}", cloudinary_config);
            Arc::new(CloudinaryStorage::new(cloudinary_config.clone()))
        }
        None => {
            tracing::warn!("Brak konfiguracji Cloudinary - obrazy będą trzymane w pamięci");
            Arc::new(MemoryBlobStorage::new("memory://blobs"))
        }
    };

    let product_cache = ProductCache::new();
    if let Err(e) = product_cache.warm(records.as_ref()).await {
        tracing::error!("Nie można wczytać produktów: {}", e);
        std::process::exit(1);
    }

    let app_state = Arc::new(AppState {
        records,
        blobs,
        product_cache,
        forms: FormRegistry::new(MAX_OPEN_FORMS, config.form_idle),
        shell_template: config.shell_template.clone(),
    });

    let app = build_router(app_state, config.max_upload_bytes);

    tracing::info!("Serwer nasłuchuje na {}", config.bind_addr);
    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Nie można powiązać adresu {}: {}", config.bind_addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        tracing::error!("Błąd serwera: {}", e);
    }
}
