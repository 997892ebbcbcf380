//! Filter state containers
//!
//! Each entity kind owns a small set of named filter fields. A field is an
//! observable string value; writing it notifies the owning kind's edit
//! channel so the synchronization engine can debounce a refresh. The
//! containers are plain composition over [`FilterField`] - there is no
//! shared base type and no dynamic dispatch.

use catalog_client::{CharacterFilter, EpisodeFilter, LocationFilter};
use storage::FavoriteQuery;
use tokio::sync::{mpsc, watch};

/// A single observable filter field
///
/// The empty string means "unconstrained", which is also the default.
#[derive(Debug)]
pub struct FilterField {
    value: watch::Sender<String>,
    edits: mpsc::UnboundedSender<()>,
}

impl FilterField {
    fn new(edits: mpsc::UnboundedSender<()>) -> Self {
        let (value, _) = watch::channel(String::new());
        Self { value, edits }
    }

    /// Write the field and signal the owning kind's debounce timer
    pub fn set(&self, value: impl Into<String>) {
        self.value.send_replace(value.into());
        // The engine side may already be gone during shutdown.
        let _ = self.edits.send(());
    }

    /// Current value of the field
    pub fn get(&self) -> String {
        self.value.borrow().clone()
    }

    /// Observe the field, for screens rendering the filter UI
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.value.subscribe()
    }

    /// Blank the field without waking the debounce timer.
    ///
    /// Resets are followed by an explicit refresh, so emitting per-field
    /// edit events would only schedule a redundant fetch.
    fn clear_silent(&self) {
        self.value.send_replace(String::new());
    }
}

/// Filter fields for character search, also used for the favorites screen
#[derive(Debug)]
pub struct CharacterFilters {
    /// Name, substring match
    pub name: FilterField,
    /// Status
    pub status: FilterField,
    /// Species
    pub species: FilterField,
    /// Gender
    pub gender: FilterField,
    /// Subtype or variant
    pub kind: FilterField,
}

impl CharacterFilters {
    pub(crate) fn new(edits: mpsc::UnboundedSender<()>) -> Self {
        Self {
            name: FilterField::new(edits.clone()),
            status: FilterField::new(edits.clone()),
            species: FilterField::new(edits.clone()),
            gender: FilterField::new(edits.clone()),
            kind: FilterField::new(edits),
        }
    }

    /// Blank every field except `name`
    pub fn reset(&self) {
        self.status.clear_silent();
        self.species.clear_silent();
        self.gender.clear_silent();
        self.kind.clear_silent();
    }

    pub(crate) fn clear_name(&self) {
        self.name.clear_silent();
    }

    /// Snapshot the fields as remote search criteria
    pub fn criteria(&self) -> CharacterFilter {
        CharacterFilter {
            name: self.name.get(),
            status: self.status.get(),
            species: self.species.get(),
            gender: self.gender.get(),
            kind: self.kind.get(),
        }
    }

    /// Snapshot the fields as a favorites store query
    pub fn favorite_query(&self) -> FavoriteQuery {
        FavoriteQuery {
            name: self.name.get(),
            status: self.status.get(),
            species: self.species.get(),
            gender: self.gender.get(),
            kind: self.kind.get(),
        }
    }
}

/// Filter fields for episode search
#[derive(Debug)]
pub struct EpisodeFilters {
    /// Title, substring match
    pub name: FilterField,
    /// Season number as a picker string
    pub season: FilterField,
    /// Episode number as a picker string
    pub episode: FilterField,
}

impl EpisodeFilters {
    pub(crate) fn new(edits: mpsc::UnboundedSender<()>) -> Self {
        Self {
            name: FilterField::new(edits.clone()),
            season: FilterField::new(edits.clone()),
            episode: FilterField::new(edits),
        }
    }

    /// Blank every field except `name`
    pub fn reset(&self) {
        self.season.clear_silent();
        self.episode.clear_silent();
    }

    /// Snapshot the fields as remote search criteria
    pub fn criteria(&self) -> EpisodeFilter {
        EpisodeFilter {
            name: self.name.get(),
            season: self.season.get(),
            episode: self.episode.get(),
        }
    }
}

/// Filter fields for location search
#[derive(Debug)]
pub struct LocationFilters {
    /// Name, substring match
    pub name: FilterField,
    /// Location type
    pub kind: FilterField,
    /// Dimension
    pub dimension: FilterField,
}

impl LocationFilters {
    pub(crate) fn new(edits: mpsc::UnboundedSender<()>) -> Self {
        Self {
            name: FilterField::new(edits.clone()),
            kind: FilterField::new(edits.clone()),
            dimension: FilterField::new(edits),
        }
    }

    /// Blank every field except `name`
    pub fn reset(&self) {
        self.kind.clear_silent();
        self.dimension.clear_silent();
    }

    /// Snapshot the fields as remote search criteria
    pub fn criteria(&self) -> LocationFilter {
        LocationFilter {
            name: self.name.get(),
            kind: self.kind.get(),
            dimension: self.dimension.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<()>,
        mpsc::UnboundedReceiver<()>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn set_updates_value_and_signals_edit() {
        let (tx, mut rx) = channel();
        let filters = CharacterFilters::new(tx);

        filters.name.set("rick");
        assert_eq!(filters.name.get(), "rick");
        assert!(rx.try_recv().is_ok());

        filters.species.set("Human");
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribers_observe_writes() {
        let (tx, _rx) = channel();
        let filters = LocationFilters::new(tx);

        let mut sub = filters.dimension.subscribe();
        filters.dimension.set("C-137");

        sub.changed().await.unwrap();
        assert_eq!(*sub.borrow(), "C-137");
    }

    #[tokio::test]
    async fn reset_keeps_name_and_is_silent() {
        let (tx, mut rx) = channel();
        let filters = CharacterFilters::new(tx);

        filters.name.set("beth");
        filters.status.set("Alive");
        filters.gender.set("Female");
        while rx.try_recv().is_ok() {}

        filters.reset();

        assert_eq!(filters.name.get(), "beth");
        assert_eq!(filters.status.get(), "");
        assert_eq!(filters.gender.get(), "");
        // No debounce wake-ups from the reset itself.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn criteria_snapshot_the_current_values() {
        let (tx, _rx) = channel();
        let filters = EpisodeFilters::new(tx);

        filters.name.set("pilot");
        filters.season.set("1");
        filters.episode.set("11");

        let criteria = filters.criteria();
        assert_eq!(criteria.name, "pilot");
        assert_eq!(criteria.code().as_deref(), Some("S01E11"));
    }

    #[tokio::test]
    async fn favorite_query_mirrors_character_fields() {
        let (tx, _rx) = channel();
        let filters = CharacterFilters::new(tx);

        filters.species.set("Human");
        let query = filters.favorite_query();
        assert_eq!(query.species, "Human");
        assert_eq!(query.name, "");
    }
}
