//! Translation, locale and tag endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::extractors::{JsonBody, PathParam, QueryParams};
use super::validation::{check_changes, check_new, check_tags_exist, listing_filter, parse_tag_list};
use super::AppState;
use crate::locale::Locale;
use crate::tag::Tag;
use crate::translation::{ExportEntry, NewTranslation, Page, Translation, TranslationChanges};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub key: Option<String>,
    pub value: Option<String>,
    /// Comma-separated tag names
    pub tags: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub tags: Option<String>,
}

/// GET /api/translations
async fn list_translations(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<Translation>>, ApiError> {
    let filter = listing_filter(query.key, query.value, query.tags.as_deref())?;
    let page = state
        .db
        .translations()
        .list(&filter, query.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

/// GET /api/translations/export/:locale_code
async fn export_translations(
    State(state): State<Arc<AppState>>,
    PathParam(locale_code): PathParam<String>,
    QueryParams(query): QueryParams<ExportQuery>,
) -> Result<Json<Vec<ExportEntry>>, ApiError> {
    let tags = parse_tag_list(query.tags.as_deref());
    let entries = state.db.translations().export(&locale_code, &tags).await?;
    Ok(Json(entries))
}

/// GET /api/translations/:id
async fn show_translation(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Translation>, ApiError> {
    Ok(Json(state.db.translations().get(id).await?))
}

/// POST /api/translations
async fn create_translation(
    State(state): State<Arc<AppState>>,
    JsonBody(data): JsonBody<NewTranslation>,
) -> Result<(StatusCode, Json<Translation>), ApiError> {
    check_new(&data)?;
    check_tags_exist(&state.db.tags(), &data.tags).await?;

    let translation = state.db.translations().create(data).await?;
    Ok((StatusCode::CREATED, Json(translation)))
}

/// PUT /api/translations/:id
async fn update_translation(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
    JsonBody(changes): JsonBody<TranslationChanges>,
) -> Result<Json<Translation>, ApiError> {
    check_changes(&changes)?;
    if let Some(tags) = &changes.tags {
        check_tags_exist(&state.db.tags(), tags).await?;
    }

    Ok(Json(state.db.translations().update(id, changes).await?))
}

/// DELETE /api/translations/:id
async fn delete_translation(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>, ApiError> {
    state.db.translations().delete(id).await?;
    Ok(Json(json!({ "message": "Translation deleted successfully" })))
}

/// GET /api/locales
async fn list_locales(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Locale>>, ApiError> {
    Ok(Json(state.db.locales().get_all().await?))
}

/// GET /api/tags
async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.db.tags().get_all().await?))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/translations", get(list_translations).post(create_translation))
        .route("/api/translations/export/:locale_code", get(export_translations))
        .route(
            "/api/translations/:id",
            get(show_translation)
                .put(update_translation)
                .delete(delete_translation),
        )
        .route("/api/locales", get(list_locales))
        .route("/api/tags", get(list_tags))
}
