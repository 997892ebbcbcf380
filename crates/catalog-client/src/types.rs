//! Wire types for the catalog API
//!
//! These mirror the remote JSON schema. Cross-entity links arrive as
//! URL-shaped reference strings; see [`crate::reference`] for turning them
//! into ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Life status of a character as reported by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterStatus {
    /// Character is alive
    Alive,
    /// Character is dead
    Dead,
    /// Status not known to the catalog
    #[serde(rename = "unknown")]
    #[serde(other)]
    Unknown,
}

impl CharacterStatus {
    /// Canonical string form, matching the wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterStatus::Alive => "Alive",
            CharacterStatus::Dead => "Dead",
            CharacterStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CharacterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named reference to a place (a character's origin or current location)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRef {
    /// Display name of the place
    pub name: String,
    /// Reference string carrying the place id; empty when the catalog has
    /// no linked place
    pub url: String,
}

/// A character entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique numeric id
    pub id: i64,
    /// Character name
    pub name: String,
    /// Life status
    pub status: CharacterStatus,
    /// Species
    pub species: String,
    /// Subtype or variant, frequently empty
    #[serde(rename = "type")]
    pub kind: String,
    /// Gender
    pub gender: String,
    /// Place the character originates from
    pub origin: PlaceRef,
    /// Place the character was last seen
    pub location: PlaceRef,
    /// Image URL
    pub image: String,
    /// Reference strings of the episodes the character appears in
    pub episode: Vec<String>,
    /// Reference string of this character
    pub url: String,
    /// When the record entered the catalog
    pub created: DateTime<Utc>,
}

/// An episode entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Unique numeric id
    pub id: i64,
    /// Episode title
    pub name: String,
    /// Air date in the catalog's human-readable form
    pub air_date: String,
    /// Episode code in `SxxEyy` form
    pub episode: String,
    /// Reference strings of the characters appearing in the episode
    pub characters: Vec<String>,
    /// Reference string of this episode
    pub url: String,
    /// When the record entered the catalog
    pub created: DateTime<Utc>,
}

/// A location entity, always fetched live and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique numeric id
    pub id: i64,
    /// Location name
    pub name: String,
    /// Location type
    #[serde(rename = "type")]
    pub kind: String,
    /// Dimension the location exists in
    pub dimension: String,
    /// Reference strings of the characters residing there
    pub residents: Vec<String>,
    /// Reference string of this location
    pub url: String,
    /// When the record entered the catalog
    pub created: DateTime<Utc>,
}

/// Pagination metadata carried by search responses
///
/// The client decodes it but does not traverse pages; list screens work off
/// the first page only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Total entities matching the query
    pub count: u64,
    /// Total pages available
    pub pages: u64,
    /// URL of the next page, if any
    pub next: Option<String>,
    /// URL of the previous page, if any
    pub prev: Option<String>,
}

/// Search response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Pagination metadata
    pub info: PageInfo,
    /// Entities on this page
    pub results: Vec<T>,
}
