//! Database layer for Confessions

mod connection;
mod kv_repository;
mod migrations;
mod repository;

pub use connection::Database;
pub use kv_repository::{KeyValueStore, LibSqlKeyValueStore};
pub use repository::LibSqlConfessionStore;
