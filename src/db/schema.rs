//! SQL DDL for initializing the database schema.

/// SQLite schema: one `files` row per upload, keyed by the blob id.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY NOT NULL,
    filename TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    expiry TEXT NOT NULL, -- RFC3339
    views INTEGER NOT NULL DEFAULT 0,
    max_downloads INTEGER NULL,
    password_hash TEXT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_files_expiry ON files(expiry);
"#;
