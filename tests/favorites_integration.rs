//! Integration tests for favorites reconciliation
//!
//! These drive [`FavoritesService`] and the engine's favorites maintenance
//! against a wiremock catalog and a real in-memory SQLite store, checking
//! that the store row stays the source of truth across episode prefetch
//! success, failure, removal, and wholesale clearing.

use std::sync::Arc;
use std::time::Duration;

use app_state::{EngineError, ErrorKind, FavoritesService, SyncEngine, SyncEngineConfig};
use catalog_client::{CatalogClient, CatalogClientConfig, Character};
use serde_json::json;
use storage::{FavoriteStore, SqliteDatabase};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn character_fixture(id: i64, name: &str, episode_ids: &[i64]) -> Character {
    let episode: Vec<String> = episode_ids
        .iter()
        .map(|id| format!("https://x/api/episode/{id}"))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "status": "Alive",
        "species": "Human",
        "type": "",
        "gender": "Male",
        "origin": { "name": "Earth", "url": "https://x/api/location/1" },
        "location": { "name": "Earth", "url": "https://x/api/location/1" },
        "image": format!("https://x/api/character/avatar/{id}.jpeg"),
        "episode": episode,
        "url": format!("https://x/api/character/{id}"),
        "created": "2017-11-04T18:48:46.250Z"
    }))
    .unwrap()
}

fn episode_fixture(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Episode {id}"),
        "air_date": "December 2, 2013",
        "episode": format!("S01E{id:02}"),
        "characters": [],
        "url": format!("https://x/api/episode/{id}"),
        "created": "2017-11-10T12:56:33.798Z"
    })
}

async fn mount_episode(server: &MockServer, id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/episode/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(episode_fixture(id)))
        .mount(server)
        .await;
}

async fn service_for(server: &MockServer) -> (FavoritesService, Arc<FavoriteStore>) {
    let client = CatalogClient::new(CatalogClientConfig::new(server.uri())).unwrap();
    let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
    let store = Arc::new(FavoriteStore::open(db).await.unwrap());
    (FavoritesService::new(client, Arc::clone(&store)), store)
}

#[tokio::test]
async fn favoriting_persists_the_character_and_its_episodes() {
    let server = MockServer::start().await;
    mount_episode(&server, 1).await;
    mount_episode(&server, 2).await;

    let (service, store) = service_for(&server).await;
    let character = character_fixture(1, "Rick Sanchez", &[1, 2]);

    service.add_favorite(&character).await.unwrap();

    assert!(service.is_favorite(1).await.unwrap());
    let stored = store.list_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Rick Sanchez");
    assert_eq!(stored[0].episode_ids, vec![1, 2]);

    let episodes = service.favorite_episodes(&stored[0].episode_ids).await.unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].code, "S01E01");
}

#[tokio::test]
async fn favoriting_without_episodes_caches_nothing_extra() {
    let server = MockServer::start().await;
    let (service, store) = service_for(&server).await;

    let character = character_fixture(7, "Abradolf Lincler", &[]);
    service.add_favorite(&character).await.unwrap();

    assert!(service.is_favorite(7).await.unwrap());
    assert!(store.episodes_by_ids(&[1, 2, 3]).await.unwrap().is_empty());
}

#[tokio::test]
async fn episode_prefetch_failure_leaves_the_favorite_in_place() {
    let server = MockServer::start().await;
    mount_episode(&server, 1).await;
    // Episode 2 is unknown to the mock; the prefetch for it fails.

    let (service, store) = service_for(&server).await;
    let character = character_fixture(2, "Morty Smith", &[1, 2]);

    let result = service.add_favorite(&character).await;
    assert!(matches!(result, Err(EngineError::Unexpected(_))));

    // The character row was committed first and survives.
    assert!(service.is_favorite(2).await.unwrap());
    // Episode 1 made it into the cache before the failure.
    assert_eq!(store.episodes_by_ids(&[1, 2]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unfavoriting_removes_the_row_but_keeps_cached_episodes() {
    let server = MockServer::start().await;
    mount_episode(&server, 1).await;

    let (service, store) = service_for(&server).await;
    service
        .add_favorite(&character_fixture(1, "Rick Sanchez", &[1]))
        .await
        .unwrap();

    service.remove_favorite(1).await.unwrap();

    assert!(!service.is_favorite(1).await.unwrap());
    assert_eq!(store.episodes_by_ids(&[1]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn clearing_favorites_empties_the_store_and_blanks_the_filters() {
    let server = MockServer::start().await;
    for id in 1..=3 {
        mount_episode(&server, id).await;
    }

    let client = CatalogClient::new(CatalogClientConfig::new(server.uri())).unwrap();
    let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
    let store = Arc::new(FavoriteStore::open(db).await.unwrap());
    let service = FavoritesService::new(client.clone(), Arc::clone(&store));
    let engine = SyncEngine::new(
        client,
        Arc::clone(&store),
        SyncEngineConfig {
            debounce: Duration::from_secs(60),
        },
    );

    service
        .add_favorite(&character_fixture(1, "Rick Sanchez", &[1]))
        .await
        .unwrap();
    service
        .add_favorite(&character_fixture(2, "Morty Smith", &[1, 2]))
        .await
        .unwrap();
    service
        .add_favorite(&character_fixture(3, "Summer Smith", &[3]))
        .await
        .unwrap();
    engine.favorite_filters().name.set("smith");

    engine.clear_favorites().await.unwrap();

    assert!(store.is_empty().await.unwrap());
    assert!(store.episodes_by_ids(&[1, 2, 3]).await.unwrap().is_empty());
    assert_eq!(engine.favorite_filters().name.get(), "");
    assert_eq!(
        engine.subscribe_favorites().borrow().error(),
        Some(ErrorKind::EmptyStore)
    );
}

#[tokio::test]
async fn favorites_list_reflects_store_changes_through_the_engine() {
    let server = MockServer::start().await;
    mount_episode(&server, 1).await;

    let client = CatalogClient::new(CatalogClientConfig::new(server.uri())).unwrap();
    let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
    let store = Arc::new(FavoriteStore::open(db).await.unwrap());
    let service = FavoritesService::new(client.clone(), Arc::clone(&store));
    let engine = SyncEngine::new(
        client,
        Arc::clone(&store),
        SyncEngineConfig {
            debounce: Duration::from_secs(60),
        },
    );

    service
        .add_favorite(&character_fixture(1, "Rick Sanchez", &[1]))
        .await
        .unwrap();
    engine.refresh_favorites().await;
    let state = engine.subscribe_favorites().borrow().clone();
    assert_eq!(state.items().map(<[_]>::len), Some(1));

    service.remove_favorite(1).await.unwrap();
    engine.refresh_favorites().await;
    assert_eq!(
        engine.subscribe_favorites().borrow().error(),
        Some(ErrorKind::EmptyStore)
    );
}
