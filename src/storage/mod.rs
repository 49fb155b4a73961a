//! Upload handling that does not touch HTTP: expiry choices, filename rules,
//! password hashing and the on-disk blob store.

pub mod blobs;
pub mod expiry;
pub mod filename;
pub mod password;

pub use blobs::BlobStore;
pub use expiry::ExpiryOption;
pub use filename::{is_allowed, secure_filename};
