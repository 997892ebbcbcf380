//! Favorites store
//!
//! Two tables back the favorites feature: `favorite_characters`, the sole
//! source of truth for "is this character a favorite", and
//! `favorite_episodes`, a cache of episode metadata referenced by favorited
//! characters. Episode rows are never deleted individually; removing a
//! character leaves its episodes behind and only [`FavoriteStore::clear_all`]
//! empties both tables.
//!
//! The character row stores its episode id list as a comma-joined string,
//! encoded and decoded strictly at this boundary.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

use crate::database::{MigrationDefinition, Result, SqliteDatabase, StoreError};

/// A character persisted as a favorite
///
/// A projection of the remote character with its relational references
/// pre-resolved: episode URLs become numeric ids, place URLs become
/// id-as-string (blank when the remote had no linked place).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCharacter {
    /// Character id, primary key
    pub id: i64,
    /// Character name
    pub name: String,
    /// Life status as a plain string (`Alive`, `Dead`, `unknown`)
    pub status: String,
    /// Species
    pub species: String,
    /// Gender
    pub gender: String,
    /// Subtype or variant
    pub kind: String,
    /// Ids of the episodes the character appears in
    pub episode_ids: Vec<i64>,
    /// Image URL
    pub image: String,
    /// Name of the character's last known location
    pub location_name: String,
    /// Location id as a string; blank means no linked location
    pub location_id: String,
    /// Name of the character's origin
    pub origin_name: String,
    /// Origin id as a string; blank means no linked origin
    pub origin_id: String,
}

/// An episode persisted because a favorited character references it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEpisode {
    /// Episode id, primary key
    pub id: i64,
    /// Episode title
    pub name: String,
    /// Air date
    pub air_date: String,
    /// Episode code in `SxxEyy` form
    pub code: String,
}

/// Filter criteria for searching favorited characters
///
/// Empty fields are unconstrained. `name`, `species` and `kind` match as
/// substrings; `status` and `gender` match as prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteQuery {
    /// Substring match on the name
    pub name: String,
    /// Prefix match on the status
    pub status: String,
    /// Substring match on the species
    pub species: String,
    /// Prefix match on the gender
    pub gender: String,
    /// Substring match on the subtype
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Substring,
    Prefix,
}

impl FavoriteQuery {
    /// Collect the non-empty criteria as (column, match kind, value) clauses.
    fn clauses(&self) -> Vec<(&'static str, MatchKind, &str)> {
        let fields = [
            ("name", MatchKind::Substring, self.name.as_str()),
            ("status", MatchKind::Prefix, self.status.as_str()),
            ("species", MatchKind::Substring, self.species.as_str()),
            ("gender", MatchKind::Prefix, self.gender.as_str()),
            ("kind", MatchKind::Substring, self.kind.as_str()),
        ];
        fields
            .into_iter()
            .filter(|(_, _, value)| !value.trim().is_empty())
            .collect()
    }
}

/// Store for favorited characters and their episodes
pub struct FavoriteStore {
    db: Arc<SqliteDatabase>,
}

impl FavoriteStore {
    /// Open the store over an existing database, applying its migrations
    pub async fn open(db: Arc<SqliteDatabase>) -> Result<Self> {
        db.migrate(&Self::migrations()).await?;
        Ok(Self { db })
    }

    /// Schema migrations owned by this store
    pub fn migrations() -> Vec<MigrationDefinition> {
        vec![
            MigrationDefinition::new(
                1,
                "Favorite characters table",
                "CREATE TABLE IF NOT EXISTS favorite_characters (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    status TEXT NOT NULL,
                    species TEXT NOT NULL,
                    gender TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    episode_ids TEXT NOT NULL,
                    image TEXT NOT NULL,
                    location_name TEXT NOT NULL,
                    location_id TEXT NOT NULL,
                    origin_name TEXT NOT NULL,
                    origin_id TEXT NOT NULL
                )",
            ),
            MigrationDefinition::new(
                2,
                "Favorite episodes table",
                "CREATE TABLE IF NOT EXISTS favorite_episodes (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    air_date TEXT NOT NULL,
                    code TEXT NOT NULL
                )",
            ),
        ]
    }

    /// Insert or replace a favorited character by primary key
    pub async fn upsert_character(&self, character: &FavoriteCharacter) -> Result<()> {
        sqlx::query(
            "INSERT INTO favorite_characters
                (id, name, status, species, gender, kind, episode_ids, image,
                 location_name, location_id, origin_name, origin_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                species = excluded.species,
                gender = excluded.gender,
                kind = excluded.kind,
                episode_ids = excluded.episode_ids,
                image = excluded.image,
                location_name = excluded.location_name,
                location_id = excluded.location_id,
                origin_name = excluded.origin_name,
                origin_id = excluded.origin_id",
        )
        .bind(character.id)
        .bind(&character.name)
        .bind(&character.status)
        .bind(&character.species)
        .bind(&character.gender)
        .bind(&character.kind)
        .bind(encode_episode_ids(&character.episode_ids))
        .bind(&character.image)
        .bind(&character.location_name)
        .bind(&character.location_id)
        .bind(&character.origin_name)
        .bind(&character.origin_id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Remove a favorited character.
    ///
    /// Episode rows it referenced are deliberately left in place; they are
    /// reclaimed only by [`Self::clear_all`].
    pub async fn delete_character(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM favorite_characters WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Check whether a character is favorited
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM favorite_characters WHERE id = ?")
                .bind(id)
                .fetch_one(self.db.pool())
                .await?;

        Ok(count > 0)
    }

    /// Search favorited characters with a runtime-assembled conjunctive
    /// filter.
    ///
    /// Only non-empty criteria contribute a clause; with no criteria the
    /// whole table is returned. Values are always bound parameters, never
    /// spliced into the SQL text, with `LIKE` metacharacters escaped so a
    /// typed `%` or `_` matches itself. The result set is independent of
    /// clause order.
    pub async fn search(&self, query: &FavoriteQuery) -> Result<Vec<FavoriteCharacter>> {
        self.search_with_clauses(&query.clauses()).await
    }

    async fn search_with_clauses(
        &self,
        clauses: &[(&'static str, MatchKind, &str)],
    ) -> Result<Vec<FavoriteCharacter>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM favorite_characters");

        let mut separator = " WHERE ";
        for (column, kind, value) in clauses {
            let escaped = escape_like(value);
            let pattern = match kind {
                MatchKind::Substring => format!("%{}%", escaped),
                MatchKind::Prefix => format!("{}%", escaped),
            };
            builder.push(separator);
            builder.push(*column);
            builder.push(" LIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\'");
            separator = " AND ";
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(character_from_row).collect()
    }

    /// All favorited characters, used to distinguish "store is empty" from
    /// "zero matches"
    pub async fn list_all(&self) -> Result<Vec<FavoriteCharacter>> {
        let rows = sqlx::query("SELECT * FROM favorite_characters ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(character_from_row).collect()
    }

    /// Check whether no characters are favorited at all
    pub async fn is_empty(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorite_characters")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count == 0)
    }

    /// Insert or replace a cached episode
    pub async fn upsert_episode(&self, episode: &FavoriteEpisode) -> Result<()> {
        sqlx::query(
            "INSERT INTO favorite_episodes (id, name, air_date, code)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                air_date = excluded.air_date,
                code = excluded.code",
        )
        .bind(episode.id)
        .bind(&episode.name)
        .bind(&episode.air_date)
        .bind(&episode.code)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Fetch the cached episodes with the given ids
    pub async fn episodes_by_ids(&self, ids: &[i64]) -> Result<Vec<FavoriteEpisode>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT * FROM favorite_episodes WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        builder.push(") ORDER BY id");

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(episode_from_row).collect()
    }

    /// Empty both tables in a single transaction
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM favorite_characters")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM favorite_episodes")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Escape `LIKE` metacharacters so a typed value matches itself.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn character_from_row(row: &SqliteRow) -> Result<FavoriteCharacter> {
    Ok(FavoriteCharacter {
        id: row.get("id"),
        name: row.get("name"),
        status: row.get("status"),
        species: row.get("species"),
        gender: row.get("gender"),
        kind: row.get("kind"),
        episode_ids: decode_episode_ids(row.get::<&str, _>("episode_ids"))?,
        image: row.get("image"),
        location_name: row.get("location_name"),
        location_id: row.get("location_id"),
        origin_name: row.get("origin_name"),
        origin_id: row.get("origin_id"),
    })
}

fn episode_from_row(row: &SqliteRow) -> Result<FavoriteEpisode> {
    Ok(FavoriteEpisode {
        id: row.get("id"),
        name: row.get("name"),
        air_date: row.get("air_date"),
        code: row.get("code"),
    })
}

/// Encode an episode id list as the comma-joined column value
pub fn encode_episode_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode the comma-joined column value back into ids.
///
/// The empty string decodes to the empty list; any non-integer segment
/// makes the row [`StoreError::Corrupt`].
pub fn decode_episode_ids(encoded: &str) -> Result<Vec<i64>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    encoded
        .split(',')
        .map(|segment| {
            segment.parse().map_err(|_| {
                StoreError::Corrupt(format!("bad episode id segment {:?}", segment))
            })
        })
        .collect()
}
