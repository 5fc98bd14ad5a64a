mod auth;
mod compliance;
mod config;
mod db;
mod documents;
mod errors;
mod faq;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::password::PasswordHasher;
use crate::auth::postgres::PgAuthService;
use crate::auth::session::spawn_session_watcher;
use crate::config::{BackendKind, Config, PostgresBackendConfig};
use crate::db::create_pool;
use crate::documents::postgres::PgDocumentStore;
use crate::documents::storage::S3ObjectStorage;
use crate::faq::chat::ChatStore;
use crate::faq::knowledge_base::KNOWLEDGE_BASE;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting compliance portal v{}", env!("CARGO_PKG_VERSION"));

    let state = match (config.backend, config.postgres.clone()) {
        (BackendKind::Postgres, Some(pg)) => build_postgres_state(&config, &pg).await?,
        (BackendKind::Postgres, None) => {
            anyhow::bail!("postgres backend selected without connection settings")
        }
        (BackendKind::Memory, _) => {
            warn!("Using in-memory backend; all data is lost on restart");
            AppState::in_memory(config.clone())
        }
    };

    // Tear down chat sessions when their owner signs out
    let _watcher = spawn_session_watcher(state.auth.clone(), state.chats.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_postgres_state(config: &Config, pg: &PostgresBackendConfig) -> Result<AppState> {
    // Initialize PostgreSQL (runs pending migrations)
    let db = create_pool(&pg.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(pg).await;
    info!("S3 client initialized (bucket: {})", pg.s3_bucket);

    let hasher = PasswordHasher::new(config.password_hash_iterations);
    Ok(AppState {
        auth: Arc::new(PgAuthService::new(db.clone(), hasher)),
        documents: Arc::new(PgDocumentStore::new(db)),
        storage: Arc::new(S3ObjectStorage::new(
            s3,
            pg.s3_bucket.clone(),
            pg.s3_public_url.clone(),
        )),
        chats: Arc::new(ChatStore::new(KNOWLEDGE_BASE)),
        config: config.clone(),
    })
}

/// Any origin when `CORS_ALLOWED_ORIGINS` is unset, otherwise only the listed ones.
fn build_cors(config: &Config) -> Result<CorsLayer> {
    if config.cors_allowed_origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS not set; allowing any origin");
        return Ok(CorsLayer::permissive());
    }
    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(pg: &PostgresBackendConfig) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &pg.aws_access_key_id,
        &pg.aws_secret_access_key,
        None,
        None,
        "portal-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(pg.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&pg.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origins(origins: &[&str]) -> Config {
        Config {
            backend: BackendKind::Memory,
            postgres: None,
            port: 0,
            rust_log: "info".to_string(),
            password_hash_iterations: 1_000,
            hr_bootstrap_emails: Vec::new(),
            federation_secret: None,
            cors_allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
        }
    }

    #[test]
    fn test_cors_origins_must_be_valid_header_values() {
        assert!(build_cors(&config_with_origins(&[])).is_ok());
        assert!(build_cors(&config_with_origins(&["https://portal.corp.com"])).is_ok());
        assert!(build_cors(&config_with_origins(&["https://bad\norigin"])).is_err());
    }
}
