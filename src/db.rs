use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Encode, QueryBuilder, Sqlite, Transaction, Type};
use tracing::info;

use crate::error::Result;
use crate::locale::LocaleRegistry;
use crate::tag::TagRegistry;
use crate::translation::TranslationStore;

/// How long a connection waits for another writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Schema statements, safe to run on every start.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS locales (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        locale_id INTEGER NOT NULL REFERENCES locales(id),
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (locale_id, key)
    )",
    "CREATE TABLE IF NOT EXISTS translation_tag (
        translation_id INTEGER NOT NULL REFERENCES translations(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (translation_id, tag_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_translations_locale_id ON translations (locale_id)",
    "CREATE INDEX IF NOT EXISTS idx_translations_key ON translations (key)",
    "CREATE INDEX IF NOT EXISTS idx_translations_value ON translations (value)",
    "CREATE INDEX IF NOT EXISTS idx_translation_tag_translation_id ON translation_tag (translation_id)",
    "CREATE INDEX IF NOT EXISTS idx_translation_tag_tag_id ON translation_tag (tag_id)",
];

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a connection pool and create tables
    ///
    /// `sqlite::memory:` databases are pinned to one connection that never
    /// expires, otherwise every pooled connection would see its own empty
    /// database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?
        };

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        info!("Database ready at {}", database_url);
        Ok(Self { pool })
    }

    /// Fresh private in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn locales(&self) -> LocaleRegistry {
        LocaleRegistry::new(self.pool.clone())
    }

    pub fn tags(&self) -> TagRegistry {
        TagRegistry::new(self.pool.clone())
    }

    pub fn translations(&self) -> TranslationStore {
        TranslationStore::new(self.pool.clone())
    }
}

/// Start a write transaction holding the database write lock from the start.
///
/// A deferred transaction that reads and then writes gets SQLITE_BUSY without
/// waiting when another connection committed in between. `BEGIN IMMEDIATE`
/// waits on the busy timeout instead, so writers run one after another.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Append `(?, ?, ...)` with one bind per value.
pub(crate) fn push_in_list<'args, T, I>(qb: &mut QueryBuilder<'args, Sqlite>, values: I)
where
    I: IntoIterator<Item = T>,
    T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
{
    qb.push("(");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

/// Drop duplicates while keeping first-seen order.
pub(crate) fn distinct<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.as_ref();
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    /// Create an on-disk database inside a temporary directory
    async fn create_file_db(temp_dir: &TempDir) -> (Database, String) {
        let db_path = temp_dir.path().join("catalog.db");
        let url = format!("sqlite://{}", db_path.display());
        let db = Database::connect(&url, 2).await.expect("Failed to create database");
        (db, url)
    }

    // ==================== Database Initialization Tests ====================

    #[tokio::test]
    async fn test_database_creates_tables() {
        let db = Database::in_memory().await.expect("in-memory db");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("list tables");

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["locales", "tags", "translation_tag", "translations"]);
    }

    #[tokio::test]
    async fn test_database_creates_indexes() {
        let db = Database::in_memory().await.expect("in-memory db");

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
        )
        .fetch_one(db.pool())
        .await
        .expect("count indexes");

        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_in_memory_shared_across_calls() {
        let db = Database::in_memory().await.expect("in-memory db");

        db.locales().create("en", "English").await.expect("create");
        db.locales().create("fr", "French").await.expect("create");

        let all = db.locales().get_all().await.expect("list");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_database_reopening() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let url = {
            let (db, url) = create_file_db(&temp_dir).await;
            db.locales().create("en", "English").await.expect("create");
            db.pool().close().await;
            url
        };

        // Reopen runs the schema again on an existing file
        let db = Database::connect(&url, 2).await.expect("Failed to reopen database");
        let locale = db.locales().get_by_code("en").await.expect("persisted locale");
        assert_eq!(locale.name, "English");
    }

    #[tokio::test]
    async fn test_invalid_database_path() {
        let result = Database::connect("sqlite:///non/existent/path/db.db", 1).await;
        assert!(result.is_err());
    }

    // ==================== Constraint Tests ====================

    #[tokio::test]
    async fn test_unique_locale_key_maps_to_conflict() {
        let db = Database::in_memory().await.expect("in-memory db");
        let locale = db.locales().create("en", "English").await.expect("create");

        let insert = "INSERT INTO translations (locale_id, key, value, created_at, updated_at)
                      VALUES (?1, 'hi', 'Hello', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')";
        sqlx::query(insert)
            .bind(locale.id)
            .execute(db.pool())
            .await
            .expect("first insert");

        let err = sqlx::query(insert)
            .bind(locale.id)
            .execute(db.pool())
            .await
            .expect_err("duplicate should fail");

        let mapped = CatalogError::from_write(err, || "hi".to_string());
        assert!(matches!(mapped, CatalogError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::in_memory().await.expect("in-memory db");

        let result = sqlx::query(
            "INSERT INTO translations (locale_id, key, value, created_at, updated_at)
             VALUES (999, 'hi', 'Hello', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "dangling locale_id should be rejected");
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_distinct_keeps_first_seen_order() {
        let values = distinct(&["b", "a", "b", "c", "a"]);
        assert_eq!(values, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_push_in_list_binds_each_value() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE name IN ");
        push_in_list(&mut qb, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(qb.sql(), "SELECT id FROM tags WHERE name IN (?, ?)");
    }
}
