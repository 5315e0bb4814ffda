//! Local-change application: what the client sends in

use chrono::{DateTime, Utc};

use crate::codec::ContentCodec;
use crate::error::Result;
use crate::models::{ChangeEvent, ChangeKind, SyncData, UserId};
use crate::store::NoteStore;

/// Apply the client's events to the store, in order, stamping every write
/// with `sync_time`.
///
/// Events are applied one at a time and each write is awaited. The first
/// failure stops the loop: earlier events stay committed, later ones are not
/// attempted. Re-sending the same events is safe because upserts and deletes
/// are idempotent.
pub async fn apply_local_changes<S, C>(
    store: &S,
    codec: &C,
    user: &UserId,
    request: &SyncData,
    sync_time: DateTime<Utc>,
) -> Result<()>
where
    S: NoteStore,
    C: ContentCodec,
{
    let synced = sync_time.timestamp_millis();
    let total = request.events.len();

    for (applied, event) in request.events.iter().enumerate() {
        if let Err(error) = apply_event(store, codec, user, event, synced).await {
            tracing::warn!(
                user = user.fingerprint(),
                note = %event.uuid,
                applied,
                skipped = total - applied - 1,
                %error,
                "Stopped applying local changes"
            );
            return Err(error);
        }
    }

    tracing::debug!(user = user.fingerprint(), applied = total, synced, "Applied local changes");
    Ok(())
}

async fn apply_event<S, C>(
    store: &S,
    codec: &C,
    user: &UserId,
    event: &ChangeEvent,
    synced: i64,
) -> Result<()>
where
    S: NoteStore,
    C: ContentCodec,
{
    match event.kind {
        ChangeKind::Deleted => store.delete(user, &event.uuid, synced).await,
        ChangeKind::Added | ChangeKind::Updated => {
            let stored = codec.to_stored(event.payload()?, synced)?;
            store.put(user, stored).await
        }
    }
}
