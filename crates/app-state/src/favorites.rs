//! Favorites reconciliation
//!
//! Projects remote characters into the favorites store and keeps the cached
//! episode rows consistent with what favorited characters reference. The
//! store row is the sole source of truth for "is this a favorite".

use std::sync::Arc;

use catalog_client::{linked_id, resolve_ids, CatalogClient, Character, Episode, ReferenceError};
use storage::{FavoriteCharacter, FavoriteEpisode, FavoriteStore};

use crate::sync::{EngineError, Result};

/// Project a remote character into its persisted favorite form.
///
/// Episode references become numeric ids and place references become
/// id-as-string; a blank place reference projects to a blank id, preserving
/// the "no linked entity" sentinel.
pub fn favorite_from_remote(character: &Character) -> std::result::Result<FavoriteCharacter, ReferenceError> {
    let episode_ids = resolve_ids(&character.episode)?;
    let location_id = linked_id(&character.location.url)?
        .map(|id| id.to_string())
        .unwrap_or_default();
    let origin_id = linked_id(&character.origin.url)?
        .map(|id| id.to_string())
        .unwrap_or_default();

    Ok(FavoriteCharacter {
        id: character.id,
        name: character.name.clone(),
        status: character.status.as_str().to_owned(),
        species: character.species.clone(),
        gender: character.gender.clone(),
        kind: character.kind.clone(),
        episode_ids,
        image: character.image.clone(),
        location_name: character.location.name.clone(),
        location_id,
        origin_name: character.origin.name.clone(),
        origin_id,
    })
}

/// Project a remote episode into its persisted favorite form
pub fn favorite_episode_from_remote(episode: &Episode) -> FavoriteEpisode {
    FavoriteEpisode {
        id: episode.id,
        name: episode.name.clone(),
        air_date: episode.air_date.clone(),
        code: episode.episode.clone(),
    }
}

/// Service keeping the favorites store consistent with remote data
#[derive(Clone)]
pub struct FavoritesService {
    client: CatalogClient,
    store: Arc<FavoriteStore>,
}

impl FavoritesService {
    /// Build the service over a catalog client and the favorites store
    pub fn new(client: CatalogClient, store: Arc<FavoriteStore>) -> Self {
        Self { client, store }
    }

    /// Favorite a character.
    ///
    /// The character projection is committed first, then each referenced
    /// episode is fetched and cached. An episode prefetch failure does not
    /// undo the favorite - the character stays favorited with whatever
    /// episode metadata made it in, and the failure surfaces to the caller
    /// as [`EngineError::Unexpected`].
    pub async fn add_favorite(&self, character: &Character) -> Result<()> {
        let favorite = favorite_from_remote(character)?;
        self.store.upsert_character(&favorite).await?;

        for id in &favorite.episode_ids {
            let episode = self.client.get_episode(*id).await.map_err(|err| {
                tracing::warn!(episode = id, error = %err, "episode prefetch failed");
                EngineError::Unexpected(format!("episode {id} prefetch failed: {err}"))
            })?;
            self.store
                .upsert_episode(&favorite_episode_from_remote(&episode))
                .await?;
        }

        Ok(())
    }

    /// Remove a character from favorites.
    ///
    /// Cached episode rows are left in place; callers refresh their lists
    /// afterwards.
    pub async fn remove_favorite(&self, id: i64) -> Result<()> {
        self.store.delete_character(id).await?;
        Ok(())
    }

    /// Whether a character is currently favorited
    pub async fn is_favorite(&self, id: i64) -> Result<bool> {
        Ok(self.store.exists(id).await?)
    }

    /// Cached episodes for a favorited character's id list
    pub async fn favorite_episodes(&self, ids: &[i64]) -> Result<Vec<FavoriteEpisode>> {
        Ok(self.store.episodes_by_ids(ids).await?)
    }

    /// Drop every favorite and every cached episode.
    ///
    /// [`crate::SyncEngine::clear_favorites`] wraps this with the filter
    /// reset and refresh the favorites screen expects.
    pub async fn clear_favorites(&self) -> Result<()> {
        self.store.clear_all().await?;
        Ok(())
    }
}
