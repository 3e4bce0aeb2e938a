use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use super::TranslationStore;
use crate::db::{distinct, push_in_list};
use crate::error::{CatalogError, Result};

/// Denormalized export row: a translation with the names of its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub key: String,
    pub value: String,
    pub tags: Vec<String>,
}

impl TranslationStore {
    /// Export the tagged translations of one locale.
    ///
    /// Rows come from an inner join through the tag bridge, so untagged
    /// translations never appear. The tag filter applies to joined rows before
    /// grouping: with a filter, each entry lists only its matching tags.
    pub async fn export<S: AsRef<str>>(&self, locale_code: &str, tags: &[S]) -> Result<Vec<ExportEntry>> {
        let mut conn = self.pool.acquire().await?;

        let (locale_id,): (i64,) = sqlx::query_as("SELECT id FROM locales WHERE code = ?1")
            .bind(locale_code)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CatalogError::not_found("locale", locale_code))?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT t.id, t.key, t.value, g.name FROM translations t \
             JOIN translation_tag tt ON tt.translation_id = t.id \
             JOIN tags g ON g.id = tt.tag_id \
             WHERE t.locale_id = ",
        );
        qb.push_bind(locale_id);

        let tags = distinct(tags);
        if !tags.is_empty() {
            qb.push(" AND g.name IN ");
            push_in_list(&mut qb, tags);
        }
        qb.push(" ORDER BY t.id, g.id");

        let rows: Vec<(i64, String, String, String)> = qb.build_query_as().fetch_all(&mut *conn).await?;
        let entries = group_rows(rows);

        debug!("Exported {} translations for locale {}", entries.len(), locale_code);
        Ok(entries)
    }
}

/// Collapse consecutive `(id, key, value, tag)` rows into one entry per id.
fn group_rows(rows: Vec<(i64, String, String, String)>) -> Vec<ExportEntry> {
    let mut entries: Vec<ExportEntry> = Vec::new();
    let mut current: Option<i64> = None;

    for (id, key, value, tag) in rows {
        match entries.last_mut() {
            Some(entry) if current == Some(id) => entry.tags.push(tag),
            _ => {
                current = Some(id);
                entries.push(ExportEntry {
                    key,
                    value,
                    tags: vec![tag],
                });
            }
        }
    }

    entries
}
