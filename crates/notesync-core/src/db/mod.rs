//! libSQL-backed persistence for notesync

mod connection;
mod migrations;
mod repository;

pub use connection::{Database, ReplicaConfig, StoreConfig};
pub use repository::LibSqlNoteStore;
