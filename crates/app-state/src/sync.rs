//! The synchronization engine
//!
//! Owns one observable list slot per entity kind plus two detail slots, and
//! coordinates every fetch that feeds them. Filter edits are debounced per
//! kind with a restartable quiet-period timer; each refresh bumps the slot's
//! generation counter so that when refreshes overlap, the last one issued
//! wins no matter which completes first. Fetch-path errors never escape to
//! observers - they are mapped onto [`ListState::Error`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use catalog_client::{
    resolve_ids, CatalogClient, Character, ClientError, Episode, Location, ReferenceError,
};
use storage::{FavoriteCharacter, FavoriteStore, StoreError};

use crate::filters::{CharacterFilters, EpisodeFilters, LocationFilters};

/// Default quiet period between the last filter edit and the fetch it triggers
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Errors surfaced by engine operations that return to a caller directly
/// (navigation lookups, favorites maintenance)
#[derive(Debug, Error)]
pub enum EngineError {
    /// Remote catalog failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Local store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A relational reference failed to resolve
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Aggregate failure with no more specific cause
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// The user-distinguishable ways a list can be in error
///
/// Four distinct states per the presentation contract: remote search matched
/// nothing, something unexpected broke, the favorites store holds nothing at
/// all, and the favorites store holds rows but none matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote search matched no entities
    NoResults,
    /// Transport failure, decode failure, or any uncategorized error
    Unexpected,
    /// No characters are favorited at all
    EmptyStore,
    /// Favorites exist but none matched the filter
    NoLocalMatches,
}

/// Observable state of one entity list
#[derive(Debug, Clone, PartialEq)]
pub enum ListState<T> {
    /// Nothing fetched yet
    Idle,
    /// A fetch is in flight; any previous list is no longer authoritative
    Loading,
    /// The current authoritative result set
    Ready(Vec<T>),
    /// The fetch failed; the list is empty
    Error(ErrorKind),
}

impl<T> ListState<T> {
    /// Whether a fetch is currently in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, ListState::Loading)
    }

    /// The items, when the list is ready
    pub fn items(&self) -> Option<&[T]> {
        match self {
            ListState::Ready(items) => Some(items),
            _ => None,
        }
    }

    /// The error kind, when the list is in error
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            ListState::Error(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// One observable list with its generation counter.
///
/// `begin` publishes `Loading` and hands out a generation token; `finish`
/// publishes the outcome only if no newer refresh has begun since. The
/// combination makes "last refresh issued wins" hold under overlap without a
/// cancellation token: a superseded completion is simply discarded.
struct ListSlot<T> {
    state: watch::Sender<ListState<T>>,
    generation: AtomicU64,
}

impl<T: Clone> ListSlot<T> {
    fn new() -> Self {
        let (state, _) = watch::channel(ListState::Idle);
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state.subscribe()
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(ListState::Loading);
        generation
    }

    fn finish(&self, generation: u64, state: ListState<T>) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded completion");
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Quiet period applied to filter edits before a refresh fires
    pub debounce: Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Characters,
    Episodes,
    Locations,
    Favorites,
}

struct Inner {
    client: CatalogClient,
    store: Arc<FavoriteStore>,

    characters: ListSlot<Character>,
    episodes: ListSlot<Episode>,
    locations: ListSlot<Location>,
    favorites: ListSlot<FavoriteCharacter>,

    // Detail slots: the episodes of one character, and the characters of one
    // episode or location.
    episode_detail: ListSlot<Episode>,
    character_detail: ListSlot<Character>,

    character_filters: CharacterFilters,
    episode_filters: EpisodeFilters,
    location_filters: LocationFilters,
    favorite_filters: CharacterFilters,
}

/// The filtered-fetch-and-cache synchronization engine
///
/// Cheap to clone; clones share all state. Dropping every clone stops the
/// debounce tasks.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Build an engine over a catalog client and a favorites store
    pub fn new(
        client: CatalogClient,
        store: Arc<FavoriteStore>,
        config: SyncEngineConfig,
    ) -> Self {
        let (character_edits_tx, character_edits_rx) = mpsc::unbounded_channel();
        let (episode_edits_tx, episode_edits_rx) = mpsc::unbounded_channel();
        let (location_edits_tx, location_edits_rx) = mpsc::unbounded_channel();
        let (favorite_edits_tx, favorite_edits_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            client,
            store,
            characters: ListSlot::new(),
            episodes: ListSlot::new(),
            locations: ListSlot::new(),
            favorites: ListSlot::new(),
            episode_detail: ListSlot::new(),
            character_detail: ListSlot::new(),
            character_filters: CharacterFilters::new(character_edits_tx),
            episode_filters: EpisodeFilters::new(episode_edits_tx),
            location_filters: LocationFilters::new(location_edits_tx),
            favorite_filters: CharacterFilters::new(favorite_edits_tx),
        });

        let debounce = config.debounce;
        spawn_debounce(Arc::downgrade(&inner), character_edits_rx, debounce, Kind::Characters);
        spawn_debounce(Arc::downgrade(&inner), episode_edits_rx, debounce, Kind::Episodes);
        spawn_debounce(Arc::downgrade(&inner), location_edits_rx, debounce, Kind::Locations);
        spawn_debounce(Arc::downgrade(&inner), favorite_edits_rx, debounce, Kind::Favorites);

        Self { inner }
    }

    // ---------------------------------------------------------------------
    // Filter access
    // ---------------------------------------------------------------------

    /// Character search filters; edits debounce into a character refresh
    pub fn character_filters(&self) -> &CharacterFilters {
        &self.inner.character_filters
    }

    /// Episode search filters
    pub fn episode_filters(&self) -> &EpisodeFilters {
        &self.inner.episode_filters
    }

    /// Location search filters
    pub fn location_filters(&self) -> &LocationFilters {
        &self.inner.location_filters
    }

    /// Favorites screen filters
    pub fn favorite_filters(&self) -> &CharacterFilters {
        &self.inner.favorite_filters
    }

    // ---------------------------------------------------------------------
    // List subscriptions
    // ---------------------------------------------------------------------

    /// Observe the character list
    pub fn subscribe_characters(&self) -> watch::Receiver<ListState<Character>> {
        self.inner.characters.subscribe()
    }

    /// Observe the episode list
    pub fn subscribe_episodes(&self) -> watch::Receiver<ListState<Episode>> {
        self.inner.episodes.subscribe()
    }

    /// Observe the location list
    pub fn subscribe_locations(&self) -> watch::Receiver<ListState<Location>> {
        self.inner.locations.subscribe()
    }

    /// Observe the favorites list
    pub fn subscribe_favorites(&self) -> watch::Receiver<ListState<FavoriteCharacter>> {
        self.inner.favorites.subscribe()
    }

    /// Observe the episode detail slot (a character's episodes)
    pub fn subscribe_episode_detail(&self) -> watch::Receiver<ListState<Episode>> {
        self.inner.episode_detail.subscribe()
    }

    /// Observe the character detail slot (an episode's or location's cast)
    pub fn subscribe_character_detail(&self) -> watch::Receiver<ListState<Character>> {
        self.inner.character_detail.subscribe()
    }

    // ---------------------------------------------------------------------
    // Refreshes (immediate, debounce-bypassing)
    // ---------------------------------------------------------------------

    /// Refresh the character list from the remote, reading the filter
    /// fields as they are now
    pub async fn refresh_characters(&self) {
        let slot = &self.inner.characters;
        let generation = slot.begin();

        let filter = self.inner.character_filters.criteria();
        tracing::debug!(?filter, "refreshing characters");

        let state = match self.inner.client.search_characters(&filter).await {
            Ok(list) => ListState::Ready(list),
            Err(err) => search_error_state(&err, "character"),
        };
        slot.finish(generation, state);
    }

    /// Refresh the episode list from the remote
    pub async fn refresh_episodes(&self) {
        let slot = &self.inner.episodes;
        let generation = slot.begin();

        let filter = self.inner.episode_filters.criteria();
        tracing::debug!(?filter, "refreshing episodes");

        let state = match self.inner.client.search_episodes(&filter).await {
            Ok(list) => ListState::Ready(list),
            Err(err) => search_error_state(&err, "episode"),
        };
        slot.finish(generation, state);
    }

    /// Refresh the location list from the remote
    pub async fn refresh_locations(&self) {
        let slot = &self.inner.locations;
        let generation = slot.begin();

        let filter = self.inner.location_filters.criteria();
        tracing::debug!(?filter, "refreshing locations");

        let state = match self.inner.client.search_locations(&filter).await {
            Ok(list) => ListState::Ready(list),
            Err(err) => search_error_state(&err, "location"),
        };
        slot.finish(generation, state);
    }

    /// Refresh the favorites list from the local store.
    ///
    /// An empty store and a filter that matched nothing are distinct
    /// outcomes; see [`ErrorKind`].
    pub async fn refresh_favorites(&self) {
        let slot = &self.inner.favorites;
        let generation = slot.begin();

        let state = match self.favorites_state().await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "favorites refresh failed");
                ListState::Error(ErrorKind::Unexpected)
            }
        };
        slot.finish(generation, state);
    }

    async fn favorites_state(&self) -> Result<ListState<FavoriteCharacter>> {
        if self.inner.store.is_empty().await? {
            return Ok(ListState::Error(ErrorKind::EmptyStore));
        }

        let query = self.inner.favorite_filters.favorite_query();
        let matches = self.inner.store.search(&query).await?;

        if matches.is_empty() {
            Ok(ListState::Error(ErrorKind::NoLocalMatches))
        } else {
            Ok(ListState::Ready(matches))
        }
    }

    // ---------------------------------------------------------------------
    // Filter resets
    // ---------------------------------------------------------------------

    /// Reset character filters (keeping name) and refresh immediately
    pub async fn reset_character_filters(&self) {
        self.inner.character_filters.reset();
        self.refresh_characters().await;
    }

    /// Reset episode filters (keeping name) and refresh immediately
    pub async fn reset_episode_filters(&self) {
        self.inner.episode_filters.reset();
        self.refresh_episodes().await;
    }

    /// Reset location filters (keeping name) and refresh immediately
    pub async fn reset_location_filters(&self) {
        self.inner.location_filters.reset();
        self.refresh_locations().await;
    }

    /// Reset favorites filters (keeping name) and refresh immediately
    pub async fn reset_favorite_filters(&self) {
        self.inner.favorite_filters.reset();
        self.refresh_favorites().await;
    }

    /// Clear the favorites store entirely, then reset every favorites
    /// filter including the name and show the (now empty) list
    pub async fn clear_favorites(&self) -> Result<()> {
        self.inner.store.clear_all().await?;
        self.inner.favorite_filters.reset();
        self.inner.favorite_filters.clear_name();
        self.refresh_favorites().await;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Detail resolution
    // ---------------------------------------------------------------------

    /// Resolve a character's episode references into the episode detail
    /// slot.
    ///
    /// The slot is cleared to `Loading` before any lookup is issued and
    /// replaced atomically on completion: observers never see a partial or
    /// duplicated batch. Lookups run concurrently; one failure fails the
    /// whole batch. On success the list has exactly one episode per input
    /// reference, in input order.
    pub async fn resolve_episodes(&self, references: &[String]) {
        let slot = &self.inner.episode_detail;
        let generation = slot.begin();

        let client = self.inner.client.clone();
        let state = match fetch_batch(references, move |id| {
            let client = client.clone();
            async move { client.get_episode(id).await }
        })
        .await
        {
            Ok(list) => ListState::Ready(list),
            Err(err) => {
                tracing::warn!(error = %err, "episode batch resolution failed");
                ListState::Error(ErrorKind::Unexpected)
            }
        };
        slot.finish(generation, state);
    }

    /// Resolve an episode's or location's character references into the
    /// character detail slot; same contract as [`Self::resolve_episodes`]
    pub async fn resolve_characters(&self, references: &[String]) {
        let slot = &self.inner.character_detail;
        let generation = slot.begin();

        let client = self.inner.client.clone();
        let state = match fetch_batch(references, move |id| {
            let client = client.clone();
            async move { client.get_character(id).await }
        })
        .await
        {
            Ok(list) => ListState::Ready(list),
            Err(err) => {
                tracing::warn!(error = %err, "character batch resolution failed");
                ListState::Error(ErrorKind::Unexpected)
            }
        };
        slot.finish(generation, state);
    }

    // ---------------------------------------------------------------------
    // Navigation lookups
    // ---------------------------------------------------------------------

    /// Fetch one location for a navigation callback
    pub async fn lookup_location(&self, id: i64) -> Result<Location> {
        Ok(self.inner.client.get_location(id).await?)
    }

    /// Fetch one episode for a navigation callback
    pub async fn lookup_episode(&self, id: i64) -> Result<Episode> {
        Ok(self.inner.client.get_episode(id).await?)
    }
}

/// Map a failed remote search onto the list error taxonomy.
///
/// This remote reports "nothing matched" as an HTTP error status, so any
/// `Http` failure renders as the no-results state; everything else is
/// unexpected.
fn search_error_state<T>(err: &ClientError, kind: &'static str) -> ListState<T> {
    match err {
        ClientError::Http { status } => {
            tracing::debug!(kind, status, "search matched nothing");
            ListState::Error(ErrorKind::NoResults)
        }
        err => {
            tracing::warn!(kind, error = %err, "search failed");
            ListState::Error(ErrorKind::Unexpected)
        }
    }
}

/// Concurrently fetch one entity per reference, all-or-nothing.
///
/// Results are placed by input index, so success yields exactly one entity
/// per reference in input order regardless of completion order.
async fn fetch_batch<T, F, Fut>(references: &[String], fetch: F) -> Result<Vec<T>>
where
    T: Clone + Send + 'static,
    F: Fn(i64) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, ClientError>> + Send + 'static,
{
    let ids = resolve_ids(references)?;

    let mut set = JoinSet::new();
    for (index, id) in ids.iter().copied().enumerate() {
        let future = fetch(id);
        set.spawn(async move { (index, future.await) });
    }

    let mut results: Vec<Option<T>> = vec![None; ids.len()];
    while let Some(joined) = set.join_next().await {
        let (index, result) =
            joined.map_err(|err| EngineError::Unexpected(err.to_string()))?;
        results[index] = Some(result?);
    }

    Ok(results.into_iter().flatten().collect())
}

fn spawn_debounce(
    inner: Weak<Inner>,
    mut edits: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
    kind: Kind,
) {
    tokio::spawn(async move {
        // One iteration per burst of edits: the timer restarts on every
        // further edit and the refresh fires once, after the quiet period,
        // reading whatever the fields hold at that moment.
        while edits.recv().await.is_some() {
            loop {
                match tokio::time::timeout(debounce, edits.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            let Some(inner) = inner.upgrade() else {
                return;
            };
            let engine = SyncEngine { inner };

            tracing::debug!(?kind, "debounce elapsed, refreshing");
            match kind {
                Kind::Characters => engine.refresh_characters().await,
                Kind::Episodes => engine.refresh_episodes().await,
                Kind::Locations => engine.refresh_locations().await,
                Kind::Favorites => engine.refresh_favorites().await,
            }
        }
    });
}
