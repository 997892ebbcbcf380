//! SQLite database layer
//!
//! Pooled SQLite access with WAL mode and versioned migrations. The
//! favorites store in [`crate::favorites`] runs its queries against the pool
//! exposed here.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLx failure
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A migration failed to apply
    #[error("migration error: {0}")]
    Migration(String),

    /// A persisted value failed to decode
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Bad database configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Maximum number of connections in pool
    pub max_connections: u32,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Enable WAL mode
    pub wal_mode: bool,
    /// Synchronous mode
    pub synchronous: SynchronousMode,
}

/// SQLite synchronous mode
#[derive(Debug, Clone, Copy)]
pub enum SynchronousMode {
    /// Off - no synchronization
    Off,
    /// Normal - synchronize at critical moments
    Normal,
    /// Full - synchronize after each write
    Full,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "catalog.db".to_string(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(30),
            wal_mode: true,
            synchronous: SynchronousMode::Normal,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable WAL mode
    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    /// Set synchronous mode
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }
}

/// Pooled SQLite database
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if missing) a database with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path))
            .map_err(|e| StoreError::Config(e.to_string()))?
            .create_if_missing(true);

        if config.wal_mode {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        options = match config.synchronous {
            SynchronousMode::Off => options.synchronous(SqliteSynchronous::Off),
            SynchronousMode::Normal => options.synchronous(SqliteSynchronous::Normal),
            SynchronousMode::Full => options.synchronous(SqliteSynchronous::Full),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run migrations
    pub async fn migrate(&self, migrations: &[MigrationDefinition]) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                checksum TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // MAX over an empty table yields a NULL row, hence the nested Option.
        let current_version: Option<Option<i64>> =
            sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
                .fetch_optional(&self.pool)
                .await?;

        let current_version = current_version.flatten().unwrap_or(0);

        for migration in migrations {
            if migration.version > current_version {
                tracing::info!(
                    "Applying migration {} - {}",
                    migration.version,
                    migration.description
                );

                let mut tx = self.pool.begin().await?;

                sqlx::query(&migration.sql).execute(&mut *tx).await?;

                sqlx::query(
                    "INSERT INTO _migrations (version, description, checksum) VALUES (?, ?, ?)",
                )
                .bind(migration.version)
                .bind(&migration.description)
                .bind(&migration.checksum)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;

                tracing::info!("Migration {} applied successfully", migration.version);
            }
        }

        Ok(())
    }

    /// Get current migration version
    pub async fn current_version(&self) -> Result<i64> {
        let version: Option<Option<i64>> =
            sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.flatten().unwrap_or(0))
    }

    /// Check if the database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Migration definition
#[derive(Debug, Clone)]
pub struct MigrationDefinition {
    /// Migration version number
    pub version: i64,
    /// Migration description
    pub description: String,
    /// SQL to execute
    pub sql: String,
    /// Checksum for verification
    pub checksum: String,
}

impl MigrationDefinition {
    /// Create a new migration definition
    pub fn new(version: i64, description: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let checksum = format!("{:x}", md5::compute(&sql));

        Self {
            version,
            description: description.into(),
            sql,
            checksum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    fn catalog_migrations() -> Vec<MigrationDefinition> {
        vec![
            MigrationDefinition::new(
                1,
                "Favorite characters table",
                "CREATE TABLE favorite_characters (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            ),
            MigrationDefinition::new(
                2,
                "Track species",
                "ALTER TABLE favorite_characters ADD COLUMN species TEXT",
            ),
        ]
    }

    #[tokio::test]
    async fn in_memory_database_answers_health_check() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        assert!(db.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn file_backed_database_opens_with_builder_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let config = DatabaseConfig::new(path.to_str().unwrap()).max_connections(2);

        let db = SqliteDatabase::new(config).await.unwrap();
        assert!(db.health_check().await.is_ok());
        db.close().await;
    }

    #[tokio::test]
    async fn migrations_apply_in_order_and_record_the_version() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.migrate(&catalog_migrations()).await.unwrap();
        assert_eq!(db.current_version().await.unwrap(), 2);

        let row = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='favorite_characters'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        let table_name: String = row.get("name");
        assert_eq!(table_name, "favorite_characters");
    }

    #[tokio::test]
    async fn reapplying_migrations_is_a_no_op() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let migrations = catalog_migrations();

        db.migrate(&migrations).await.unwrap();
        let before = db.current_version().await.unwrap();

        db.migrate(&migrations).await.unwrap();
        let after = db.current_version().await.unwrap();

        assert_eq!(before, after);
        assert_eq!(after, 2);
    }

    #[test]
    fn config_builder_sets_every_field() {
        let config = DatabaseConfig::new("catalog.db")
            .max_connections(5)
            .connect_timeout(Duration::from_secs(10))
            .wal_mode(true)
            .synchronous(SynchronousMode::Full);

        assert_eq!(config.path, "catalog.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.wal_mode);
        assert!(matches!(config.synchronous, SynchronousMode::Full));
    }
}
