//! Locale lookup and lazy creation.
//!
//! Every public operation acquires its own connection. The `fetch_*`
//! associated functions take a connection instead, so the translation store
//! can consult the registry inside its own transaction.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::db::{begin_write, distinct, push_in_list};
use crate::error::{CatalogError, Result};

/// A language-region identity that scopes a set of translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Locale {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Clone)]
pub struct LocaleRegistry {
    pool: SqlitePool,
}

impl LocaleRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Locale> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Locale> {
        sqlx::query_as::<_, Locale>("SELECT id, code, name FROM locales WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found("locale", code))
    }

    /// Names are not unique; the oldest locale with this name wins.
    pub async fn get_by_name(&self, name: &str) -> Result<Locale> {
        sqlx::query_as::<_, Locale>(
            "SELECT id, code, name FROM locales WHERE name = ?1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::not_found("locale", name))
    }

    /// All locales in creation order
    pub async fn get_all(&self) -> Result<Vec<Locale>> {
        let locales = sqlx::query_as::<_, Locale>("SELECT id, code, name FROM locales ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        debug!("Loaded {} locales", locales.len());
        Ok(locales)
    }

    pub async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locales WHERE code = ?1")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Create a locale explicitly. A taken code is a `Conflict`.
    pub async fn create(&self, code: &str, name: &str) -> Result<Locale> {
        let mut conn = self.pool.acquire().await?;
        let locale = Self::insert(&mut conn, code, name).await?;
        info!("Created locale {} ({})", locale.code, locale.id);
        Ok(locale)
    }

    /// Return the locale for every requested name, creating the missing ones
    /// with `code = lowercase(name)`.
    ///
    /// The result follows the order of first appearance in `names`.
    pub async fn create_or_retrieve_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Locale>> {
        let names = distinct(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = begin_write(&self.pool).await?;
        let existing = Self::fetch_where_in(&mut tx, "name", &names).await?;

        let mut locales = Vec::with_capacity(names.len());
        for name in &names {
            match existing.iter().find(|l| &l.name == name) {
                Some(locale) => locales.push(locale.clone()),
                None => {
                    let locale = Self::insert(&mut tx, &name.to_lowercase(), name).await?;
                    info!("Created locale {} ({}) by name", locale.code, locale.id);
                    locales.push(locale);
                }
            }
        }

        tx.commit().await?;
        Ok(locales)
    }

    /// Return the locale for every requested code, creating the missing ones
    /// with `name = capitalize(code)`.
    ///
    /// The result follows the order of first appearance in `codes`.
    pub async fn create_or_retrieve_by_codes<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<Locale>> {
        let codes = distinct(codes);
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = begin_write(&self.pool).await?;
        let existing = Self::fetch_where_in(&mut tx, "code", &codes).await?;

        let mut locales = Vec::with_capacity(codes.len());
        for code in &codes {
            match existing.iter().find(|l| &l.code == code) {
                Some(locale) => locales.push(locale.clone()),
                None => {
                    let locale = Self::insert(&mut tx, code, &capitalize(code)).await?;
                    info!("Created locale {} ({}) by code", locale.code, locale.id);
                    locales.push(locale);
                }
            }
        }

        tx.commit().await?;
        Ok(locales)
    }

    pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Locale> {
        sqlx::query_as::<_, Locale>("SELECT id, code, name FROM locales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CatalogError::not_found("locale", id))
    }

    async fn fetch_where_in(
        conn: &mut SqliteConnection,
        column: &'static str,
        values: &[String],
    ) -> Result<Vec<Locale>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, code, name FROM locales WHERE ");
        qb.push(column).push(" IN ");
        push_in_list(&mut qb, values.iter().cloned());
        qb.push(" ORDER BY id");

        Ok(qb.build_query_as::<Locale>().fetch_all(&mut *conn).await?)
    }

    async fn insert(conn: &mut SqliteConnection, code: &str, name: &str) -> Result<Locale> {
        let id = sqlx::query("INSERT INTO locales (code, name) VALUES (?1, ?2)")
            .bind(code)
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                CatalogError::from_write(e, || format!("locale code '{}' already exists", code))
            })?
            .last_insert_rowid();

        Ok(Locale {
            id,
            code: code.to_string(),
            name: name.to_string(),
        })
    }
}

/// Uppercase the first character, leave the rest untouched.
fn capitalize(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
