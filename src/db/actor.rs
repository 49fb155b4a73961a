use crate::db::models::{DbFile, DownloadClaim, NewFile};
use crate::db::schema::SQLITE_INIT;
use crate::error::SatchelError;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

const FILE_COLUMNS: &str =
    "id, filename, original_filename, expiry, views, max_downloads, password_hash, created_at";

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a freshly uploaded file.
    Insert(NewFile, RpcReplyPort<Result<(), SatchelError>>),

    /// Get a file row by id.
    Get(String, RpcReplyPort<Result<Option<DbFile>, SatchelError>>),

    /// Count one download if the file is still available, drop it otherwise.
    ClaimDownload(
        String,
        DateTime<Utc>,
        RpcReplyPort<Result<DownloadClaim, SatchelError>>,
    ),

    /// Delete a file row by id; replies whether a row existed.
    Delete(String, RpcReplyPort<Result<bool, SatchelError>>),

    /// Delete every expired or exhausted row and return their ids.
    PurgeExpired(DateTime<Utc>, RpcReplyPort<Result<Vec<String>, SatchelError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn insert(&self, file: NewFile) -> Result<(), SatchelError> {
        ractor::call!(self.actor, DbActorMessage::Insert, file)
            .map_err(|e| SatchelError::RactorError(format!("DbActor Insert RPC failed: {e}")))?
    }

    pub async fn get(&self, id: &str) -> Result<Option<DbFile>, SatchelError> {
        ractor::call!(self.actor, DbActorMessage::Get, id.to_string())
            .map_err(|e| SatchelError::RactorError(format!("DbActor Get RPC failed: {e}")))?
    }

    pub async fn claim_download(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<DownloadClaim, SatchelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ClaimDownload,
            id.to_string(),
            now
        )
        .map_err(|e| SatchelError::RactorError(format!("DbActor ClaimDownload RPC failed: {e}")))?
    }

    pub async fn delete(&self, id: &str) -> Result<bool, SatchelError> {
        ractor::call!(self.actor, DbActorMessage::Delete, id.to_string())
            .map_err(|e| SatchelError::RactorError(format!("DbActor Delete RPC failed: {e}")))?
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>, SatchelError> {
        ractor::call!(self.actor, DbActorMessage::PurgeExpired, now).map_err(|e| {
            SatchelError::RactorError(format!("DbActor PurgeExpired RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Insert(file, reply) => {
                let res = self.insert(&state.pool, file).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Get(id, reply) => {
                let res = self.get(&state.pool, &id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ClaimDownload(id, now, reply) => {
                let res = self.claim_download(&state.pool, &id, now).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Delete(id, reply) => {
                let res = self.delete(&state.pool, &id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::PurgeExpired(now, reply) => {
                let res = self.purge_expired(&state.pool, now).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn insert(&self, pool: &SqlitePool, file: NewFile) -> Result<(), SatchelError> {
        sqlx::query(
            r#"
        INSERT INTO files (
            id, filename, original_filename, expiry, views, max_downloads, password_hash, created_at
        )
        VALUES (?, ?, ?, ?, 0, ?, ?, ?)
        "#,
        )
        .bind(file.id)
        .bind(file.filename)
        .bind(file.original_filename)
        .bind(file.expiry)
        .bind(file.max_downloads)
        .bind(file.password_hash)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn get(&self, pool: &SqlitePool, id: &str) -> Result<Option<DbFile>, SatchelError> {
        let row = sqlx::query_as::<_, DbFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn claim_download(
        &self,
        pool: &SqlitePool,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<DownloadClaim, SatchelError> {
        let Some(file) = self.get(pool, id).await? else {
            return Ok(DownloadClaim::NotFound);
        };

        if !file.is_available(now) {
            self.delete(pool, id).await?;
            debug!(id = %id, views = file.views, "Dropped unavailable file on download attempt");
            return Ok(DownloadClaim::Expired(file));
        }

        let updated = sqlx::query_as::<_, DbFile>(&format!(
            "UPDATE files SET views = views + 1 WHERE id = ? RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(DownloadClaim::Granted(updated))
    }

    async fn delete(&self, pool: &SqlitePool, id: &str) -> Result<bool, SatchelError> {
        let res = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn purge_expired(
        &self,
        pool: &SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, SatchelError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
        DELETE FROM files
        WHERE expiry <= ?
           OR (max_downloads IS NOT NULL AND views >= max_downloads)
        RETURNING id
        "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }
}

/// Spawn the database actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, SatchelError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| SatchelError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

/// Applies [`SQLITE_INIT`] statement by statement; every statement is idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), SatchelError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
