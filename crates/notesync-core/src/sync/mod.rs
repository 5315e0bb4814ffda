//! Two-way incremental sync between one client replica and the note store.
//!
//! A round is split into two independent halves that share one request and
//! one `sync_time`:
//!
//! - [`resolve_remote_changes`] reads the notes the client is missing.
//! - [`apply_local_changes`] writes the client's own changes.
//!
//! Neither half locks the user's collection. Rounds from several devices of
//! the same user may interleave; the last write per uuid wins and a resolver
//! read may see another round half-applied. The next round converges.

mod applier;
mod coordinator;
mod resolver;

pub use applier::apply_local_changes;
pub use coordinator::{SyncCoordinator, SyncOptions};
pub use resolver::resolve_remote_changes;
