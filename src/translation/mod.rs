//! Translation records, their locale, and their tag associations.
//!
//! Values leaving this module are fully materialized: every `Translation`
//! carries its `Locale` and complete tag set, loaded eagerly.
//!
//! Multi-statement mutations (create + attach, update + sync, delete) run in
//! one transaction each. A failure anywhere rolls the whole operation back.

mod export;
mod filter;

pub use export::ExportEntry;
pub use filter::TranslationFilter;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, warn};

use crate::db::{begin_write, distinct, push_in_list};
use crate::error::{CatalogError, Result};
use crate::locale::{Locale, LocaleRegistry};
use crate::tag::{Tag, TagRegistry};

/// Fixed listing page size
pub const PAGE_SIZE: u32 = 10;

const SELECT_TRANSLATION: &str = "SELECT t.id, t.locale_id, t.key, t.value, t.created_at, t.updated_at, \
     l.code AS locale_code, l.name AS locale_name \
     FROM translations t JOIN locales l ON l.id = t.locale_id";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub id: i64,
    pub locale_id: i64,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub locale: Locale,
    pub tags: Vec<Tag>,
}

/// Payload for `TranslationStore::create`
#[derive(Debug, Clone, Deserialize)]
pub struct NewTranslation {
    pub locale_id: i64,
    pub key: String,
    pub value: String,
    /// Names of existing tags. Unknown names are ignored.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves a field untouched; `tags: Some(..)` replaces
/// the whole tag set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationChanges {
    pub locale_id: Option<i64>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// One page of a forward-only listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

#[derive(sqlx::FromRow)]
struct TranslationRow {
    id: i64,
    locale_id: i64,
    key: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    locale_code: String,
    locale_name: String,
}

impl TranslationRow {
    fn into_translation(self, tags: Vec<Tag>) -> Translation {
        Translation {
            id: self.id,
            locale_id: self.locale_id,
            key: self.key,
            value: self.value,
            created_at: self.created_at,
            updated_at: self.updated_at,
            locale: Locale {
                id: self.locale_id,
                code: self.locale_code,
                name: self.locale_name,
            },
            tags,
        }
    }
}

#[derive(Clone)]
pub struct TranslationStore {
    pool: SqlitePool,
}

impl TranslationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List translations matching `filter`, ordered by id, `PAGE_SIZE` per page.
    ///
    /// `page` is 1-based; 0 is treated as 1.
    pub async fn list(&self, filter: &TranslationFilter, page: u32) -> Result<Page<Translation>> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(PAGE_SIZE);

        let mut conn = self.pool.acquire().await?;

        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_TRANSLATION);
        filter.push_predicate(&mut qb);
        qb.push(" ORDER BY t.id ASC LIMIT ")
            .push_bind(i64::from(PAGE_SIZE) + 1)
            .push(" OFFSET ")
            .push_bind(offset);

        let mut rows = qb
            .build_query_as::<TranslationRow>()
            .fetch_all(&mut *conn)
            .await?;

        let has_more = rows.len() > PAGE_SIZE as usize;
        rows.truncate(PAGE_SIZE as usize);

        let items = Self::materialize(&mut conn, rows).await?;
        debug!("Listed {} translations (page {}, more: {})", items.len(), page, has_more);

        Ok(Page {
            items,
            page,
            per_page: PAGE_SIZE,
            has_more,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Translation> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Insert a translation and attach whichever of its tag names resolve.
    pub async fn create(&self, data: NewTranslation) -> Result<Translation> {
        let mut tx = begin_write(&self.pool).await?;

        if let Err(e) = LocaleRegistry::fetch_by_id(&mut tx, data.locale_id).await {
            warn!("Rejected translation '{}': {}", data.key, e);
            return Err(e);
        }
        Self::ensure_key_free(&mut tx, data.locale_id, &data.key, None).await?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO translations (locale_id, key, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(data.locale_id)
        .bind(&data.key)
        .bind(&data.value)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| CatalogError::from_write(e, || key_conflict(&data.key, data.locale_id)))?
        .last_insert_rowid();

        if !data.tags.is_empty() {
            let tags = TagRegistry::fetch_by_names(&mut tx, &distinct(&data.tags)).await?;
            Self::attach(&mut tx, id, &tags).await?;
        }

        let translation = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            "Created translation {} ({}:{}) with {} tags",
            id,
            translation.locale.code,
            translation.key,
            translation.tags.len()
        );
        Ok(translation)
    }

    /// Apply a partial update. Supplied tags replace the previous set.
    pub async fn update(&self, id: i64, changes: TranslationChanges) -> Result<Translation> {
        let mut tx = begin_write(&self.pool).await?;

        let (current_locale, current_key): (i64, String) =
            sqlx::query_as("SELECT locale_id, key FROM translations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CatalogError::not_found("translation", id))?;

        if let Some(locale_id) = changes.locale_id {
            if let Err(e) = LocaleRegistry::fetch_by_id(&mut tx, locale_id).await {
                warn!("Rejected update of translation {}: {}", id, e);
                return Err(e);
            }
        }

        let locale_id = changes.locale_id.unwrap_or(current_locale);
        let key = changes.key.unwrap_or(current_key);
        Self::ensure_key_free(&mut tx, locale_id, &key, Some(id)).await?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE translations
             SET locale_id = ?1, key = ?2, value = COALESCE(?3, value), updated_at = ?4
             WHERE id = ?5",
        )
        .bind(locale_id)
        .bind(&key)
        .bind(changes.value.as_deref())
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| CatalogError::from_write(e, || key_conflict(&key, locale_id)))?;

        if let Some(names) = changes.tags {
            let tags = TagRegistry::fetch_by_names(&mut tx, &distinct(&names)).await?;
            Self::sync(&mut tx, id, &tags).await?;
        }

        let translation = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!("Updated translation {}", id);
        Ok(translation)
    }

    /// Remove a translation and all of its tag associations.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("DELETE FROM translation_tag WHERE translation_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM translations WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(CatalogError::not_found("translation", id));
        }

        tx.commit().await?;
        info!("Deleted translation {}", id);
        Ok(())
    }

    async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Translation> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_TRANSLATION);
        qb.push(" WHERE t.id = ").push_bind(id);

        let row = qb
            .build_query_as::<TranslationRow>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CatalogError::not_found("translation", id))?;

        let mut translations = Self::materialize(conn, vec![row]).await?;
        translations
            .pop()
            .ok_or_else(|| CatalogError::not_found("translation", id))
    }

    /// Attach tags to rows with one batched query.
    async fn materialize(conn: &mut SqliteConnection, rows: Vec<TranslationRow>) -> Result<Vec<Translation>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT tt.translation_id, g.id, g.name FROM translation_tag tt \
             JOIN tags g ON g.id = tt.tag_id WHERE tt.translation_id IN ",
        );
        push_in_list(&mut qb, rows.iter().map(|r| r.id));
        qb.push(" ORDER BY tt.translation_id, g.id");

        let pairs: Vec<(i64, i64, String)> = qb.build_query_as().fetch_all(&mut *conn).await?;

        let mut by_translation: HashMap<i64, Vec<Tag>> = HashMap::new();
        for (translation_id, id, name) in pairs {
            by_translation
                .entry(translation_id)
                .or_default()
                .push(Tag { id, name });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_translation.remove(&row.id).unwrap_or_default();
                row.into_translation(tags)
            })
            .collect())
    }

    /// `(locale_id, key)` must be unused by any other translation.
    async fn ensure_key_free(
        conn: &mut SqliteConnection,
        locale_id: i64,
        key: &str,
        exclude: Option<i64>,
    ) -> Result<()> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM translations
             WHERE locale_id = ?1 AND key = ?2 AND (?3 IS NULL OR id != ?3)",
        )
        .bind(locale_id)
        .bind(key)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await?;

        if count > 0 {
            return Err(CatalogError::Conflict(key_conflict(key, locale_id)));
        }
        Ok(())
    }

    async fn attach(conn: &mut SqliteConnection, translation_id: i64, tags: &[Tag]) -> Result<()> {
        for tag in tags {
            sqlx::query(
                "INSERT INTO translation_tag (translation_id, tag_id) VALUES (?1, ?2)
                 ON CONFLICT (translation_id, tag_id) DO NOTHING",
            )
            .bind(translation_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Make `tags` the complete tag set of the translation.
    async fn sync(conn: &mut SqliteConnection, translation_id: i64, tags: &[Tag]) -> Result<()> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM translation_tag WHERE translation_id = ");
        qb.push_bind(translation_id);
        if !tags.is_empty() {
            qb.push(" AND tag_id NOT IN ");
            push_in_list(&mut qb, tags.iter().map(|t| t.id));
        }
        let detached = qb.build().execute(&mut *conn).await?.rows_affected();

        Self::attach(conn, translation_id, tags).await?;
        debug!("Synced translation {}: {} tags, {} detached", translation_id, tags.len(), detached);
        Ok(())
    }
}

fn key_conflict(key: &str, locale_id: i64) -> String {
    format!("key '{}' already exists for locale {}", key, locale_id)
}
