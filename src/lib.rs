pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod storage;
pub mod workers;

pub use error::SatchelError;
