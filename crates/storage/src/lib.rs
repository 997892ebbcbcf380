//! Local persistence for the catalog browser
//!
//! This crate owns the SQLite database behind the favorites feature: the
//! pooled connection layer with migrations, and the favorites store with its
//! dynamic filtered search.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod favorites;

pub use database::{DatabaseConfig, MigrationDefinition, SqliteDatabase, StoreError};
pub use favorites::{FavoriteCharacter, FavoriteEpisode, FavoriteQuery, FavoriteStore};
