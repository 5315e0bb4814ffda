//! Conversion between the client form and the storage form of a note

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Note, StoredNote};

/// Encode/decode pair for note content.
///
/// The sync protocol treats content as opaque; implementations decide how it
/// is laid out in the store.
pub trait ContentCodec: Send + Sync {
    fn encode(&self, content: &Value) -> Result<String>;

    fn decode(&self, stored: &str) -> Result<Value>;

    /// Storage form of `note`, stamped with the server write time.
    ///
    /// Null-valued object entries are dropped from the content at every
    /// depth, so they are never stored or sent back out.
    fn to_stored(&self, note: &Note, synced: i64) -> Result<StoredNote> {
        let content = note
            .content
            .clone()
            .and_then(strip_nulls)
            .map(|content| self.encode(&content))
            .transpose()?;
        Ok(StoredNote {
            uuid: note.uuid,
            status: note.status,
            content,
            synced,
        })
    }

    /// Client form of `stored`; `synced` is dropped.
    fn to_client(&self, stored: &StoredNote) -> Result<Note> {
        let content = stored
            .content
            .as_deref()
            .map(|content| self.decode(content))
            .transpose()?;
        Ok(Note {
            uuid: stored.uuid,
            status: stored.status,
            content,
        })
    }
}

/// `value` without null-valued object entries; `None` if `value` is itself null.
///
/// Nulls inside arrays are kept so element positions do not shift.
pub fn strip_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(key, value)| strip_nulls(value).map(|value| (key, value)))
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .map(|item| strip_nulls(item).unwrap_or(Value::Null))
                .collect(),
        )),
        other => Some(other),
    }
}

/// Stores content as compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentCodec;

impl ContentCodec for JsonContentCodec {
    fn encode(&self, content: &Value) -> Result<String> {
        serde_json::to_string(content).map_err(|error| Error::Codec(error.to_string()))
    }

    fn decode(&self, stored: &str) -> Result<Value> {
        serde_json::from_str(stored).map_err(|error| Error::Codec(error.to_string()))
    }
}
