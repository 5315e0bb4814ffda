//! notesync-core - Core library for notesync
//!
//! This crate contains the change-event model, the record stores, and the two
//! halves of the sync protocol (remote-change resolution and local-change
//! application) used by the notesync backend.

pub mod codec;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use error::{Error, Result, SyncError};
pub use models::{
    ChangeEvent, ChangeKind, Note, NoteId, NoteStatus, StoredNote, SyncData, UserId,
};
