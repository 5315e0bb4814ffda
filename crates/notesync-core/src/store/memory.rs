//! In-memory note store

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::NoteStore;
use crate::error::Result;
use crate::models::{NoteId, StoredNote, UserId};

/// Process-local [`NoteStore`], used by tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<UserId, HashMap<NoteId, StoredNote>>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notes (tombstones included) held for `user`
    pub async fn len(&self, user: &UserId) -> usize {
        self.notes.read().await.get(user).map_or(0, HashMap::len)
    }
}

impl NoteStore for MemoryNoteStore {
    async fn query_changed_since(
        &self,
        user: &UserId,
        after_exclusive: i64,
    ) -> Result<Vec<StoredNote>> {
        let guard = self.notes.read().await;
        let mut changed: Vec<StoredNote> = guard
            .get(user)
            .into_iter()
            .flat_map(HashMap::values)
            .filter(|note| note.synced > after_exclusive)
            .cloned()
            .collect();
        changed.sort_by(|a, b| a.synced.cmp(&b.synced).then(a.uuid.cmp(&b.uuid)));
        Ok(changed)
    }

    async fn get(&self, user: &UserId, uuid: &NoteId) -> Result<Option<StoredNote>> {
        let guard = self.notes.read().await;
        Ok(guard.get(user).and_then(|notes| notes.get(uuid)).cloned())
    }

    async fn put(&self, user: &UserId, note: StoredNote) -> Result<()> {
        let mut guard = self.notes.write().await;
        guard.entry(user.clone()).or_default().insert(note.uuid, note);
        Ok(())
    }

    async fn delete(&self, user: &UserId, uuid: &NoteId, synced: i64) -> Result<()> {
        let mut guard = self.notes.write().await;
        if let Some(note) = guard.get_mut(user).and_then(|notes| notes.get_mut(uuid)) {
            if !note.is_deleted() {
                *note = StoredNote::tombstone(*uuid, synced);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteStatus;
    use pretty_assertions::assert_eq;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn active(synced: i64) -> StoredNote {
        StoredNote {
            uuid: NoteId::new(),
            status: NoteStatus::Active,
            content: Some("\"body\"".to_string()),
            synced,
        }
    }

    #[tokio::test]
    async fn query_is_exclusive_and_ordered() {
        let store = MemoryNoteStore::new();
        let alice = user("alice");
        let late = active(30);
        let boundary = active(10);
        let middle = active(20);
        for note in [late.clone(), boundary, middle.clone()] {
            store.put(&alice, note).await.unwrap();
        }

        let changed = store.query_changed_since(&alice, 10).await.unwrap();
        assert_eq!(changed, vec![middle, late]);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = MemoryNoteStore::new();
        let note = active(5);
        store.put(&user("alice"), note.clone()).await.unwrap();

        assert!(store.get(&user("bob"), &note.uuid).await.unwrap().is_none());
        assert!(store
            .query_changed_since(&user("bob"), 0)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.len(&user("alice")).await, 1);
    }

    #[tokio::test]
    async fn delete_tombstones_once() {
        let store = MemoryNoteStore::new();
        let alice = user("alice");
        let note = active(5);
        store.put(&alice, note.clone()).await.unwrap();

        store.delete(&alice, &note.uuid, 9).await.unwrap();
        store.delete(&alice, &note.uuid, 12).await.unwrap();

        let stored = store.get(&alice, &note.uuid).await.unwrap().unwrap();
        assert_eq!(stored, StoredNote::tombstone(note.uuid, 9));
    }

    #[tokio::test]
    async fn delete_of_absent_note_writes_nothing() {
        let store = MemoryNoteStore::new();
        let alice = user("alice");
        store.delete(&alice, &NoteId::new(), 9).await.unwrap();
        assert_eq!(store.len(&alice).await, 0);
    }
}
