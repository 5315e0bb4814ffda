//! Note model, in both the client form and the server storage form

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Client-generated unique identifier of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Soft-delete marker. A note only ever moves from `Active` to `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteStatus {
    Active,
    Deleted,
}

impl NoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Deleted => "Deleted",
        }
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown note status `{other}`")),
        }
    }
}

/// A note as the client sees it.
///
/// Carries no `synced` field; the server write time lives only on
/// [`StoredNote`]. Unknown fields in a client payload, `synced` included,
/// are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub uuid: NoteId,
    /// Soft delete marker
    pub status: NoteStatus,
    /// Opaque client payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl Note {
    /// Create an active note with the given content
    #[must_use]
    pub fn new(content: Value) -> Self {
        Self {
            uuid: NoteId::new(),
            status: NoteStatus::Active,
            content: Some(content),
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self.status, NoteStatus::Deleted)
    }
}

/// A note as persisted by a [`NoteStore`](crate::store::NoteStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub uuid: NoteId,
    pub status: NoteStatus,
    /// Content in storage form, produced by a [`ContentCodec`](crate::codec::ContentCodec)
    pub content: Option<String>,
    /// Server write time (Unix ms); the change-detection index
    pub synced: i64,
}

impl StoredNote {
    /// Tombstone for `uuid` written at `synced`
    #[must_use]
    pub const fn tombstone(uuid: NoteId, synced: i64) -> Self {
        Self {
            uuid,
            status: NoteStatus::Deleted,
            content: None,
            synced,
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self.status, NoteStatus::Deleted)
    }
}
