//! Startup sequence run before the server binds.
//!
//! Both steps are idempotent: an existing data directory is left alone and an
//! existing database file is never re-initialized.

use crate::config::StorageConfig;
use crate::db::apply_schema;
use crate::error::SatchelError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// What [`prepare`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootstrapReport {
    pub created_data_dir: bool,
    pub initialized_database: bool,
}

pub async fn prepare(storage: &StorageConfig) -> Result<BootstrapReport, SatchelError> {
    let created_data_dir = ensure_dir(&storage.data_dir).await?;
    if created_data_dir {
        info!(path = %storage.data_dir.display(), "Created data directory");
    }

    let initialized_database = if tokio::fs::try_exists(&storage.database_path).await? {
        info!(
            path = %storage.database_path.display(),
            "Database file present; skipping initialization"
        );
        false
    } else {
        initialize_database(&storage.database_path).await?;
        info!(path = %storage.database_path.display(), "Initialized database");
        true
    };

    Ok(BootstrapReport {
        created_data_dir,
        initialized_database,
    })
}

async fn ensure_dir(path: &Path) -> Result<bool, SatchelError> {
    if tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        return Ok(false);
    }
    tokio::fs::create_dir_all(path).await?;
    Ok(true)
}

async fn initialize_database(path: &Path) -> Result<(), SatchelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;

    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}
