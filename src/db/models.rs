use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbFile {
    /// Upload id; also the blob name inside the data directory.
    pub id: String,
    /// Sanitized filename.
    pub filename: String,
    pub original_filename: String,
    pub expiry: DateTime<Utc>,
    pub views: i64,
    pub max_downloads: Option<i64>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbFile {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_downloads.is_some_and(|max| self.views >= max)
    }

    /// Still downloadable at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_exhausted()
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Row data for a fresh upload.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub expiry: DateTime<Utc>,
    pub max_downloads: Option<i64>,
    pub password_hash: Option<String>,
}

/// Outcome of an attempt to take one download from a file.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadClaim {
    /// The download was counted; carries the row as it is after the increment.
    Granted(DbFile),
    /// The file was past its expiry or download cap and its row has been removed.
    Expired(DbFile),
    NotFound,
}
