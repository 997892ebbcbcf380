//! HTTP client for the public catalog API
//!
//! This crate provides typed access to the remote catalog of characters,
//! episodes and locations: point lookups by id, parameterized search, and
//! resolution of the URL-shaped relational references the API uses to link
//! entities together.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod filter;
pub mod reference;
pub mod types;

pub use client::{CatalogClient, CatalogClientConfig, ClientError};
pub use filter::{max_episode_in_season, CharacterFilter, EpisodeFilter, LocationFilter};
pub use reference::{linked_id, resolve_id, resolve_ids, ReferenceError};
pub use types::{Character, CharacterStatus, Episode, Location, Page, PageInfo, PlaceRef};
