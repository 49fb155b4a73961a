//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `actor.rs`: the actor owning the connection pool

pub mod actor;
pub mod models;
pub mod schema;

pub use models::{DbFile, DownloadClaim, NewFile};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, apply_schema, spawn};
