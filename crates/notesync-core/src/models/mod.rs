//! Data models for notesync

mod change;
mod note;
mod user;

pub use change::{ChangeEvent, ChangeKind, SyncData};
pub use note::{Note, NoteId, NoteStatus, StoredNote};
pub use user::UserId;
