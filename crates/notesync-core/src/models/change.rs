//! Change events and the sync payload exchanged in both directions

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::note::{Note, NoteId};
use crate::error::{Error, Result};

/// Kind of mutation a change event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed mutation since the last sync.
///
/// `note` is present iff `kind` is not [`ChangeKind::Deleted`]; see
/// [`ChangeEvent::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub uuid: NoteId,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
}

impl ChangeEvent {
    #[must_use]
    pub fn added(note: Note) -> Self {
        Self {
            uuid: note.uuid,
            kind: ChangeKind::Added,
            note: Some(note),
        }
    }

    #[must_use]
    pub fn updated(note: Note) -> Self {
        Self {
            uuid: note.uuid,
            kind: ChangeKind::Updated,
            note: Some(note),
        }
    }

    #[must_use]
    pub const fn deleted(uuid: NoteId) -> Self {
        Self {
            uuid,
            kind: ChangeKind::Deleted,
            note: None,
        }
    }

    /// Check the event shape: a note on every upsert, none on a delete, and
    /// the note's uuid matching the event's.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match (self.kind, &self.note) {
            (ChangeKind::Deleted, None) => Ok(()),
            (ChangeKind::Deleted, Some(_)) => Err(format!(
                "Deleted event for {} must not carry a note",
                self.uuid
            )),
            (kind, None) => Err(format!("{kind} event for {} is missing its note", self.uuid)),
            (_, Some(note)) if note.uuid != self.uuid => Err(format!(
                "event uuid {} does not match note uuid {}",
                self.uuid, note.uuid
            )),
            (_, Some(_)) => Ok(()),
        }
    }

    /// The note carried by an upsert event.
    pub fn payload(&self) -> Result<&Note> {
        self.validate().map_err(Error::InvalidInput)?;
        self.note.as_ref().ok_or_else(|| {
            Error::InvalidInput(format!("{} event for {} carries no note", self.kind, self.uuid))
        })
    }
}

/// Sync payload: the client's local changes on the way in, the changes the
/// client is missing on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    /// Checkpoint below which both sides already agree
    pub last_sync: DateTime<Utc>,
    /// Required on the wire; an empty batch is sent as `[]`
    pub events: Vec<ChangeEvent>,
}

impl SyncData {
    #[must_use]
    pub const fn new(last_sync: DateTime<Utc>, events: Vec<ChangeEvent>) -> Self {
        Self { last_sync, events }
    }

    /// Validate every event and the size of the batch.
    pub fn validate(&self, max_events: usize) -> std::result::Result<(), String> {
        if self.events.len() > max_events {
            return Err(format!(
                "too many events: {} > {max_events}",
                self.events.len()
            ));
        }
        self.events.iter().try_for_each(ChangeEvent::validate)
    }

    /// Uuids the client reported this round
    pub fn submitted_ids(&self) -> HashSet<NoteId> {
        self.events.iter().map(|event| event.uuid).collect()
    }

    /// Checkpoint in the store's timestamp unit (Unix ms, floored)
    pub fn last_sync_millis(&self) -> i64 {
        self.last_sync.timestamp_millis()
    }
}
