//! The catalog HTTP client
//!
//! Thin typed wrapper over the remote REST endpoints: point lookups
//! (`/character/{id}` and friends) and parameterized search
//! (`/character?name=...`). One quirk of this particular remote leaks into
//! the contract: a search that matches nothing is reported as HTTP 404, not
//! as an empty result list, so "no results" surfaces as
//! [`ClientError::Http`] and callers decide how to present it.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::filter::{CharacterFilter, EpisodeFilter, LocationFilter};
use crate::types::{Character, Episode, Location, Page};

/// Default remote endpoint
pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by catalog requests
#[derive(Debug, Error)]
pub enum ClientError {
    /// A point lookup found no entity with the requested id
    #[error("no {entity} with id {id}")]
    NotFound {
        /// Entity kind that was looked up
        entity: &'static str,
        /// The id that had no match
        id: i64,
    },

    /// The remote answered with a non-2xx status (including its
    /// 404-for-zero-search-matches convention)
    #[error("remote returned HTTP {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Transport-level failure: DNS, connect, timeout
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The response body did not match the expected schema
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client could not be constructed from its configuration
    #[error("client configuration: {0}")]
    Config(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Configuration for [`CatalogClient`]
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the remote API, without a trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("catalog-browser/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CatalogClientConfig {
    /// Create a configuration pointing at the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Client for the remote catalog API
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Build a client from configuration
    pub fn new(config: CatalogClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Fetch a character by id
    pub async fn get_character(&self, id: i64) -> Result<Character> {
        self.get_entity("character", id).await
    }

    /// Fetch an episode by id
    pub async fn get_episode(&self, id: i64) -> Result<Episode> {
        self.get_entity("episode", id).await
    }

    /// Fetch a location by id
    pub async fn get_location(&self, id: i64) -> Result<Location> {
        self.get_entity("location", id).await
    }

    /// Search characters; each non-empty filter field constrains the query
    pub async fn search_characters(&self, filter: &CharacterFilter) -> Result<Vec<Character>> {
        self.search("character", filter.params()).await
    }

    /// Search episodes; season and episode numbers compose into an
    /// episode-code constraint when both are set
    pub async fn search_episodes(&self, filter: &EpisodeFilter) -> Result<Vec<Episode>> {
        self.search("episode", filter.params()).await
    }

    /// Search locations
    pub async fn search_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        self.search("location", filter.params()).await
    }

    async fn get_entity<T: DeserializeOwned>(&self, entity: &'static str, id: i64) -> Result<T> {
        let url = format!("{}/{}/{}", self.base_url, entity, id);
        tracing::debug!(%url, "catalog point lookup");

        let response = self.http.get(&url).send().await.map_err(transport)?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound { entity, id });
        }
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn search<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, entity);
        tracing::debug!(%url, ?params, "catalog search");

        let mut request = self.http.get(&url);
        if !params.is_empty() {
            request = request.query(&params);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        // The remote reports "nothing matched" as 404; treated uniformly
        // with every other non-2xx status here.
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let page: Page<T> = serde_json::from_slice(&body)?;
        Ok(page.results)
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Unavailable(err.to_string())
}
