//! libSQL implementation of `NoteStore`

use std::sync::Arc;

use libsql::{params, Row, Value};
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{NoteId, NoteStatus, StoredNote, UserId};
use crate::store::NoteStore;

const NOTE_COLUMNS: &str = "uuid, status, content, synced";

/// [`NoteStore`] persisted in a libSQL database.
///
/// Statements are serialized through one connection.
#[derive(Clone)]
pub struct LibSqlNoteStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlNoteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Parse a note from a row selected with [`NOTE_COLUMNS`]
    fn parse_note(row: &Row) -> Result<StoredNote> {
        let uuid: String = row.get(0)?;
        let status: String = row.get(1)?;
        let content = match row.get_value(2)? {
            Value::Null => None,
            Value::Text(text) => Some(text),
            other => {
                return Err(Error::CorruptRecord(format!(
                    "note {uuid} has non-text content ({other:?})"
                )))
            }
        };

        Ok(StoredNote {
            uuid: uuid
                .parse()
                .map_err(|_| Error::CorruptRecord(format!("invalid note uuid `{uuid}`")))?,
            status: status.parse::<NoteStatus>().map_err(Error::CorruptRecord)?,
            content,
            synced: row.get(3)?,
        })
    }
}

impl NoteStore for LibSqlNoteStore {
    async fn query_changed_since(
        &self,
        user: &UserId,
        after_exclusive: i64,
    ) -> Result<Vec<StoredNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!(
                    "SELECT {NOTE_COLUMNS} FROM notes
                     WHERE user_id = ?1 AND synced > ?2
                     ORDER BY synced ASC, uuid ASC"
                ),
                params![user.as_str(), after_exclusive],
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::parse_note(&row)?);
        }
        Ok(notes)
    }

    async fn get(&self, user: &UserId, uuid: &NoteId) -> Result<Option<StoredNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 AND uuid = ?2"),
                params![user.as_str(), uuid.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_note(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, user: &UserId, note: StoredNote) -> Result<()> {
        let content = note.content.map_or(Value::Null, Value::Text);
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO notes (user_id, uuid, status, content, synced)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id, uuid) DO UPDATE SET
                     status = excluded.status,
                     content = excluded.content,
                     synced = excluded.synced",
                params![
                    user.as_str(),
                    note.uuid.as_str(),
                    note.status.as_str(),
                    content,
                    note.synced
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, user: &UserId, uuid: &NoteId, synced: i64) -> Result<()> {
        let db = self.db.lock().await;
        let rows = db
            .connection()
            .execute(
                "UPDATE notes SET status = ?1, content = NULL, synced = ?2
                 WHERE user_id = ?3 AND uuid = ?4 AND status = ?5",
                params![
                    NoteStatus::Deleted.as_str(),
                    synced,
                    user.as_str(),
                    uuid.as_str(),
                    NoteStatus::Active.as_str()
                ],
            )
            .await?;

        if rows == 0 {
            tracing::debug!(note = %uuid, "Delete of absent or already-deleted note ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    async fn setup() -> LibSqlNoteStore {
        let db = Database::connect(&StoreConfig::in_memory()).await.unwrap();
        LibSqlNoteStore::new(db)
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn active(content: &str, synced: i64) -> StoredNote {
        StoredNote {
            uuid: NoteId::new(),
            status: NoteStatus::Active,
            content: Some(content.to_string()),
            synced,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let store = setup().await;
        let alice = user("alice");
        let note = active("\"hello\"", 100);

        store.put(&alice, note.clone()).await.unwrap();

        assert_eq!(store.get(&alice, &note.uuid).await.unwrap(), Some(note));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_overwrites() {
        let store = setup().await;
        let alice = user("alice");
        let mut note = active("\"v1\"", 100);
        store.put(&alice, note.clone()).await.unwrap();

        note.content = None;
        note.synced = 200;
        store.put(&alice, note.clone()).await.unwrap();

        assert_eq!(store.get(&alice, &note.uuid).await.unwrap(), Some(note));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_changed_since_is_exclusive_and_ordered() {
        let store = setup().await;
        let alice = user("alice");
        let boundary = active("1", 10);
        let late = active("3", 30);
        let middle = active("2", 20);
        for note in [boundary, late.clone(), middle.clone()] {
            store.put(&alice, note).await.unwrap();
        }
        store.put(&user("bob"), active("4", 40)).await.unwrap();

        let changed = store.query_changed_since(&alice, 10).await.unwrap();
        assert_eq!(changed, vec![middle, late]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_tombstones_active_note_only() {
        let store = setup().await;
        let alice = user("alice");
        let note = active("\"bye\"", 100);
        store.put(&alice, note.clone()).await.unwrap();

        store.delete(&alice, &note.uuid, 150).await.unwrap();
        store.delete(&alice, &note.uuid, 175).await.unwrap();
        store.delete(&alice, &NoteId::new(), 175).await.unwrap();

        assert_eq!(
            store.get(&alice, &note.uuid).await.unwrap(),
            Some(StoredNote::tombstone(note.uuid, 150))
        );
        assert_eq!(store.query_changed_since(&alice, 0).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupt_uuid_is_reported() {
        let store = setup().await;
        let alice = user("alice");
        let note = active("\"x\"", 100);
        store.put(&alice, note.clone()).await.unwrap();
        {
            let db = store.db.lock().await;
            db.connection()
                .execute("UPDATE notes SET uuid = 'not-a-uuid'", ())
                .await
                .unwrap();
        }

        let err = store.query_changed_since(&alice, 0).await.unwrap_err();
        assert!(matches!(err, Error::CorruptRecord(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_notes_survive_reopen() {
        let tmp = tempdir().unwrap();
        let config = StoreConfig::local(tmp.path().join("notes.db"));
        let alice = user("alice");
        let note = active("\"persisted\"", 100);

        {
            let store = LibSqlNoteStore::new(Database::connect(&config).await.unwrap());
            store.put(&alice, note.clone()).await.unwrap();
        }

        let store = LibSqlNoteStore::new(Database::connect(&config).await.unwrap());
        assert_eq!(store.get(&alice, &note.uuid).await.unwrap(), Some(note));
    }
}
