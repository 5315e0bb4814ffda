//! Remote-change resolution: what the server sends back

use crate::codec::ContentCodec;
use crate::error::Result;
use crate::models::{ChangeEvent, SyncData, UserId};
use crate::store::NoteStore;

/// Change events for every note of `user` written after `request.last_sync`.
///
/// A note whose uuid the client submitted in this same request is skipped,
/// even when the stored copy is newer than the client's checkpoint: the
/// client's submission always wins echo suppression.
///
/// Tombstones become `Deleted` events; everything else is reported as
/// `Added`, since the server cannot tell whether the client already holds an
/// older copy. `Updated` is never emitted.
pub async fn resolve_remote_changes<S, C>(
    store: &S,
    codec: &C,
    user: &UserId,
    request: &SyncData,
) -> Result<Vec<ChangeEvent>>
where
    S: NoteStore,
    C: ContentCodec,
{
    let submitted = request.submitted_ids();
    let changed = store
        .query_changed_since(user, request.last_sync_millis())
        .await?;
    let scanned = changed.len();

    let mut events = Vec::with_capacity(scanned);
    for stored in changed {
        if submitted.contains(&stored.uuid) {
            continue;
        }
        let event = if stored.is_deleted() {
            ChangeEvent::deleted(stored.uuid)
        } else {
            ChangeEvent::added(codec.to_client(&stored)?)
        };
        events.push(event);
    }

    tracing::debug!(
        user = user.fingerprint(),
        scanned,
        suppressed = scanned - events.len(),
        emitted = events.len(),
        "Resolved remote changes"
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonContentCodec;
    use crate::error::Error;
    use crate::models::{ChangeKind, Note, NoteId, NoteStatus, StoredNote};
    use crate::store::MemoryNoteStore;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const T0: i64 = 1_700_000_000_000;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    async fn seed(store: &MemoryNoteStore, text: &str, synced: i64) -> Note {
        let note = Note::new(json!({ "text": text }));
        store
            .put(&alice(), JsonContentCodec.to_stored(&note, synced).unwrap())
            .await
            .unwrap();
        note
    }

    #[tokio::test]
    async fn emits_added_for_every_newer_note() {
        let store = MemoryNoteStore::new();
        seed(&store, "old", T0 - 1).await;
        seed(&store, "boundary", T0).await;
        let fresh = seed(&store, "fresh", T0 + 1).await;

        let request = SyncData::new(at(T0), Vec::new());
        let events = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::added(fresh)]);
    }

    #[tokio::test]
    async fn tombstones_become_deleted_events() {
        let store = MemoryNoteStore::new();
        let uuid = NoteId::new();
        store
            .put(&alice(), StoredNote::tombstone(uuid, T0 + 5))
            .await
            .unwrap();

        let request = SyncData::new(at(T0), Vec::new());
        let events = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::deleted(uuid)]);
        assert_eq!(events[0].note, None);
    }

    #[tokio::test]
    async fn submitted_uuids_are_never_echoed() {
        let store = MemoryNoteStore::new();
        let mine = seed(&store, "server copy", T0 + 10).await;
        let theirs = seed(&store, "other device", T0 + 20).await;

        let mut edited = mine.clone();
        edited.content = Some(json!({ "text": "client copy" }));
        let request = SyncData::new(at(T0), vec![ChangeEvent::updated(edited)]);

        let events = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::added(theirs)]);
    }

    #[tokio::test]
    async fn never_emits_updated() {
        let store = MemoryNoteStore::new();
        for index in 0..5 {
            seed(&store, &format!("note {index}"), T0 + index).await;
        }

        let request = SyncData::new(at(0), Vec::new());
        let events = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap();

        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|event| event.kind == ChangeKind::Added));
    }

    #[tokio::test]
    async fn deleted_status_upsert_is_reported_as_deleted() {
        let store = MemoryNoteStore::new();
        let mut note = Note::new(json!("bye"));
        note.status = NoteStatus::Deleted;
        store
            .put(&alice(), JsonContentCodec.to_stored(&note, T0 + 1).unwrap())
            .await
            .unwrap();

        let request = SyncData::new(at(T0), Vec::new());
        let events = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap();

        assert_eq!(events, vec![ChangeEvent::deleted(note.uuid)]);
    }

    #[tokio::test]
    async fn malformed_stored_content_fails() {
        let store = MemoryNoteStore::new();
        store
            .put(
                &alice(),
                StoredNote {
                    uuid: NoteId::new(),
                    status: NoteStatus::Active,
                    content: Some("{broken".to_string()),
                    synced: T0 + 1,
                },
            )
            .await
            .unwrap();

        let request = SyncData::new(at(T0), Vec::new());
        let err = resolve_remote_changes(&store, &JsonContentCodec, &alice(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
