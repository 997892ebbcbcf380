//! Reactive application state for the catalog browser
//!
//! This crate is the synchronization core between the remote catalog, the
//! local favorites store, and the screens observing them: per-kind filter
//! state, debounced generation-guarded refreshes, batch detail resolution,
//! and favorites reconciliation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod favorites;
pub mod filters;
pub mod sync;

pub use favorites::{favorite_episode_from_remote, favorite_from_remote, FavoritesService};
pub use filters::{CharacterFilters, EpisodeFilters, FilterField, LocationFilters};
pub use sync::{EngineError, ErrorKind, ListState, SyncEngine, SyncEngineConfig};
