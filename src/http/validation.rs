//! Request checks applied before payloads reach the store.

use crate::error::{CatalogError, Result};
use crate::tag::TagRegistry;
use crate::translation::{NewTranslation, TranslationChanges, TranslationFilter};

/// Longest accepted key or filter string, in characters
pub const MAX_FIELD_LEN: usize = 255;

/// Split a comma-separated tag list, trimming entries and dropping blanks.
pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub fn listing_filter(key: Option<String>, value: Option<String>, tags: Option<&str>) -> Result<TranslationFilter> {
    check_len("key", key.as_deref())?;
    check_len("value", value.as_deref())?;

    Ok(TranslationFilter {
        key,
        value,
        ..TranslationFilter::new()
    }
    .with_tags(&parse_tag_list(tags)))
}

pub fn check_new(data: &NewTranslation) -> Result<()> {
    check_required("key", &data.key)?;
    check_len("key", Some(&data.key))?;
    check_required("value", &data.value)
}

pub fn check_changes(changes: &TranslationChanges) -> Result<()> {
    if let Some(key) = &changes.key {
        check_required("key", key)?;
        check_len("key", Some(key))?;
    }
    if let Some(value) = &changes.value {
        check_required("value", value)?;
    }
    Ok(())
}

/// Every name must belong to an existing tag.
pub async fn check_tags_exist(tags: &TagRegistry, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let known = tags.get_by_names(names).await?;
    let unknown: Vec<&str> = names
        .iter()
        .filter(|n| !known.iter().any(|t| &t.name == *n))
        .map(String::as_str)
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!("unknown tags: {}", unknown.join(", "))))
    }
}

fn check_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn check_len(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > MAX_FIELD_LEN => Err(CatalogError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_FIELD_LEN
        ))),
        _ => Ok(()),
    }
}
