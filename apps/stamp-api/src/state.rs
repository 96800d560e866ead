//! Application state for the stamp API

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use stamp_core::SigningEngine;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::storage::FileStore;

pub struct AppState {
    pub db: SqlitePool,
    pub files: FileStore,
    pub engine: Arc<SigningEngine>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub async fn new(config: &ServiceConfig) -> Result<Self> {
        let files = FileStore::new(&config.storage_dir).with_context(|| {
            format!(
                "Failed to prepare storage directory {}",
                config.storage_dir.display()
            )
        })?;

        let db_url = config.database_url();
        tracing::info!("Connecting to database: {}", db_url);

        let options = SqliteConnectOptions::from_str(&db_url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let engine = SigningEngine::new(config.stamp_config()?)?;

        Self::from_parts(pool, files, engine, config.max_upload_bytes).await
    }

    /// Build state from already-constructed parts and run migrations.
    pub async fn from_parts(
        db: SqlitePool,
        files: FileStore,
        engine: SigningEngine,
        max_upload_bytes: usize,
    ) -> Result<Self> {
        Self::run_migrations(&db).await?;
        Ok(Self {
            db,
            files,
            engine: Arc::new(engine),
            max_upload_bytes,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                original_pdf TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                page_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signatures (
                id TEXT PRIMARY KEY,
                image_file TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signed_documents (
                id TEXT PRIMARY KEY,
                original_document TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                signature TEXT NOT NULL REFERENCES signatures(id) ON DELETE CASCADE,
                signed_pdf TEXT NOT NULL,
                signed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_signatures_created_at ON signatures(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_signed_documents_signed_at ON signed_documents(signed_at)",
            "CREATE INDEX IF NOT EXISTS idx_signed_documents_original_document ON signed_documents(original_document)",
            "CREATE INDEX IF NOT EXISTS idx_signed_documents_signature ON signed_documents(signature)",
        ] {
            sqlx::query(index).execute(pool).await?;
        }

        tracing::info!("Migrations complete");
        Ok(())
    }
}
