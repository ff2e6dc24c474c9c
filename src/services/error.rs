use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced by the analytics and recommendation services.
///
/// Empty months and empty cohorts are not errors: queries over them return
/// empty collections or defined zero values.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required backing table or input column is absent. Fix the data
    /// upstream and re-run ingestion; there is nothing to retry here.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// The billing-to-resource join would be one-to-many. Fatal for the
    /// enrichment call; never auto-corrected.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
