use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::db::{begin_write, distinct, push_in_list};
use crate::error::{CatalogError, Result};

/// A reusable label attachable to many translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct TagRegistry {
    pool: SqlitePool,
}

impl TagRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    /// Tags whose name is in `names`. Unknown names are dropped, never created.
    pub async fn get_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Tag>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_names(&mut conn, &distinct(names)).await
    }

    /// Create a tag explicitly. A taken name is a `Conflict`.
    pub async fn create(&self, name: &str) -> Result<Tag> {
        let id = sqlx::query("INSERT INTO tags (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::from_write(e, || format!("tag '{}' already exists", name)))?
            .last_insert_rowid();

        info!("Created tag {} ({})", name, id);
        Ok(Tag {
            id,
            name: name.to_string(),
        })
    }

    /// Existing tags plus newly created ones for names with no match.
    ///
    /// One tag per distinct name; no ordering guarantee beyond tag id.
    pub async fn create_or_retrieve_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Tag>> {
        let names = distinct(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = begin_write(&self.pool).await?;

        let existing = Self::fetch_by_names(&mut tx, &names).await?;
        let missing: Vec<&String> = names
            .iter()
            .filter(|name| !existing.iter().any(|t| &t.name == *name))
            .collect();

        for name in &missing {
            sqlx::query("INSERT INTO tags (name) VALUES (?1) ON CONFLICT (name) DO NOTHING")
                .bind(name.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let tags = if missing.is_empty() {
            existing
        } else {
            info!("Created {} new tags", missing.len());
            Self::fetch_by_names(&mut tx, &names).await?
        };

        tx.commit().await?;
        Ok(tags)
    }

    /// Remove a tag and its associations. Tagged translations survive.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;

        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ?1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CatalogError::not_found("tag", name))?;

        let detached = sqlx::query("DELETE FROM translation_tag WHERE tag_id = ?1")
            .bind(tag.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM tags WHERE id = ?1")
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Deleted tag {} and {} associations", name, detached);
        Ok(())
    }

    pub(crate) async fn fetch_by_names(conn: &mut SqliteConnection, names: &[String]) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM tags WHERE name IN ");
        push_in_list(&mut qb, names.iter().cloned());
        qb.push(" ORDER BY id");

        let tags = qb.build_query_as::<Tag>().fetch_all(&mut *conn).await?;
        if tags.len() < names.len() {
            debug!("Resolved {} of {} tag names", tags.len(), names.len());
        }
        Ok(tags)
    }
}
