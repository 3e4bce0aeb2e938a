use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failures surfaced by the registries and the translation store.
///
/// Every variant is scoped to a single request; nothing here is fatal to the
/// process.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a store error to `Conflict` when it is a unique constraint violation.
    pub(crate) fn from_write(err: sqlx::Error, conflict: impl FnOnce() -> String) -> Self {
        let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
        if unique {
            Self::Conflict(conflict())
        } else {
            Self::Database(err)
        }
    }
}
