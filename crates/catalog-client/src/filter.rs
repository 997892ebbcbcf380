//! Search filter criteria
//!
//! Each entity kind has its own filter struct. Fields default to the empty
//! string, which means "unconstrained"; only non-empty fields become query
//! parameters on the wire.

/// Search criteria for characters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterFilter {
    /// Substring match on the character name
    pub name: String,
    /// Life status (`Alive`, `Dead`, `unknown`)
    pub status: String,
    /// Species
    pub species: String,
    /// Gender
    pub gender: String,
    /// Subtype or variant (the remote's `type` field)
    pub kind: String,
}

impl CharacterFilter {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "name", &self.name);
        push_param(&mut params, "status", &self.status);
        push_param(&mut params, "species", &self.species);
        push_param(&mut params, "gender", &self.gender);
        push_param(&mut params, "type", &self.kind);
        params
    }
}

/// Search criteria for episodes
///
/// Season and episode numbers are provided as the raw picker strings; they
/// only constrain the search when both are set, in which case they compose
/// into a single `SxxEyy` episode-code parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeFilter {
    /// Substring match on the episode title
    pub name: String,
    /// Season number as entered, e.g. `"1"`
    pub season: String,
    /// Episode number as entered, e.g. `"11"`
    pub episode: String,
}

impl EpisodeFilter {
    /// Compose the `SxxEyy` episode code from the season and episode fields.
    ///
    /// Returns `None` unless both fields hold a parseable number; a
    /// half-specified pair never constrains the search.
    pub fn code(&self) -> Option<String> {
        let season: u32 = self.season.trim().parse().ok()?;
        let episode: u32 = self.episode.trim().parse().ok()?;
        Some(format!("S{:02}E{:02}", season, episode))
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "name", &self.name);
        if let Some(code) = self.code() {
            params.push(("episode", code));
        }
        params
    }
}

/// Search criteria for locations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter {
    /// Substring match on the location name
    pub name: String,
    /// Location type (the remote's `type` field)
    pub kind: String,
    /// Dimension
    pub dimension: String,
}

impl LocationFilter {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "name", &self.name);
        push_param(&mut params, "type", &self.kind);
        push_param(&mut params, "dimension", &self.dimension);
        params
    }
}

/// Highest episode number a season picker should offer.
///
/// Season 1 ran eleven episodes, every later season ten. This is a fixed
/// domain fact surfaced for UI pickers, not a constraint the client
/// enforces on searches.
pub fn max_episode_in_season(season: u32) -> u32 {
    if season == 1 {
        11
    } else {
        10
    }
}

fn push_param(params: &mut Vec<(&'static str, String)>, key: &'static str, value: &str) {
    if !value.trim().is_empty() {
        params.push((key, value.to_owned()));
    }
}
