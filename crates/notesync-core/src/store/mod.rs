//! Record store interface used by the sync protocol

mod memory;

use std::future::Future;

use crate::error::Result;
use crate::models::{NoteId, StoredNote, UserId};

pub use memory::MemoryNoteStore;

/// Per-user collection of notes keyed by uuid and indexed by `synced`.
///
/// Every call is scoped to one user. Implementations may block on I/O; the
/// sync layer awaits each call before issuing the next.
pub trait NoteStore: Send + Sync {
    /// Notes of `user` with `synced > after_exclusive`, ordered by `synced`
    /// ascending (ties broken by uuid).
    fn query_changed_since(
        &self,
        user: &UserId,
        after_exclusive: i64,
    ) -> impl Future<Output = Result<Vec<StoredNote>>> + Send;

    /// Note of `user` at `uuid`, tombstones included
    fn get(
        &self,
        user: &UserId,
        uuid: &NoteId,
    ) -> impl Future<Output = Result<Option<StoredNote>>> + Send;

    /// Insert or overwrite the note at `note.uuid`
    fn put(&self, user: &UserId, note: StoredNote) -> impl Future<Output = Result<()>> + Send;

    /// Tombstone the note at `uuid`, stamping it with `synced`.
    ///
    /// Deleting an absent or already-deleted note succeeds without writing.
    fn delete(
        &self,
        user: &UserId,
        uuid: &NoteId,
        synced: i64,
    ) -> impl Future<Output = Result<()>> + Send;
}
