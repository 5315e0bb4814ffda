//! Entry point of a sync round

use std::time::Instant;

use chrono::{DateTime, SubsecRound, Utc};

use super::{apply_local_changes, resolve_remote_changes};
use crate::codec::{ContentCodec, JsonContentCodec};
use crate::error::{Error, SyncError};
use crate::models::{SyncData, UserId};
use crate::store::NoteStore;

/// Default cap on the number of events accepted in one round
pub const DEFAULT_MAX_EVENTS: usize = 500;

/// Per-round limits applied before any store access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub max_events: usize,
}

impl SyncOptions {
    #[must_use]
    pub const fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

/// Validates a sync request, runs both halves of the protocol against one
/// store, and assembles the reply.
pub struct SyncCoordinator<S, C = JsonContentCodec> {
    store: S,
    codec: C,
    options: SyncOptions,
}

impl<S: NoteStore> SyncCoordinator<S> {
    pub const fn new(store: S, options: SyncOptions) -> Self {
        Self::with_codec(store, JsonContentCodec, options)
    }
}

impl<S: NoteStore, C: ContentCodec> SyncCoordinator<S, C> {
    pub const fn with_codec(store: S, codec: C, options: SyncOptions) -> Self {
        Self {
            store,
            codec,
            options,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn options(&self) -> SyncOptions {
        self.options
    }

    /// Run one round from a raw JSON request to a raw JSON response.
    ///
    /// Fails with `Unauthenticated` when `caller` is absent and with
    /// `InvalidArgument` when the body does not decode or validate; neither
    /// touches the store.
    pub async fn sync(&self, caller: Option<&UserId>, raw: &[u8]) -> Result<Vec<u8>, SyncError> {
        let user = caller.ok_or(SyncError::Unauthenticated)?;
        let request: SyncData = serde_json::from_slice(raw).map_err(|error| {
            tracing::debug!(user = user.fingerprint(), %error, "Rejected undecodable sync request");
            SyncError::invalid_argument(error.to_string())
        })?;

        let response = self.sync_data(Some(user), request).await?;
        serde_json::to_vec(&response)
            .map_err(|error| internal_failure(user, "encode response", &Error::from(error)))
    }

    /// Run one round on an already decoded request.
    pub async fn sync_data(
        &self,
        caller: Option<&UserId>,
        request: SyncData,
    ) -> Result<SyncData, SyncError> {
        self.sync_data_at(caller, request, capture_sync_time()).await
    }

    /// Run one round with an explicit checkpoint time.
    ///
    /// `sync_time` stamps every write of the round and becomes the
    /// response's `last_sync`.
    pub async fn sync_data_at(
        &self,
        caller: Option<&UserId>,
        request: SyncData,
        sync_time: DateTime<Utc>,
    ) -> Result<SyncData, SyncError> {
        let user = caller.ok_or(SyncError::Unauthenticated)?;
        request
            .validate(self.options.max_events)
            .map_err(|reason| {
                tracing::debug!(user = user.fingerprint(), %reason, "Rejected invalid sync request");
                SyncError::InvalidArgument(reason)
            })?;

        let started = Instant::now();
        let events = resolve_remote_changes(&self.store, &self.codec, user, &request)
            .await
            .map_err(|error| internal_failure(user, "resolve remote changes", &error))?;
        apply_local_changes(&self.store, &self.codec, user, &request, sync_time)
            .await
            .map_err(|error| internal_failure(user, "apply local changes", &error))?;

        tracing::info!(
            user = user.fingerprint(),
            received = request.events.len(),
            sent = events.len(),
            elapsed = ?started.elapsed(),
            "Completed sync round"
        );
        Ok(SyncData::new(sync_time, events))
    }
}

/// Wall-clock now, truncated to the store's millisecond resolution.
fn capture_sync_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn internal_failure(user: &UserId, stage: &'static str, error: &Error) -> SyncError {
    tracing::error!(user = user.fingerprint(), stage, %error, "Sync round failed");
    SyncError::Internal
}
