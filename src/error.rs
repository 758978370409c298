use thiserror::Error;

/// Errors surfaced to callers that drive a [`Page`](crate::Page) with events
/// naming tables, columns or URLs that do not exist.
///
/// Reconciliation and enrichment never produce these; they are total over
/// whatever markup they are handed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("table `{0}` is not mounted")]
    UnknownTable(String),

    #[error("table `{table}` has no row `{row}`")]
    UnknownRow { table: String, row: String },

    #[error("table `{table}` has no column {column}")]
    InvalidColumn { table: String, column: usize },

    #[error("column {column} of table `{table}` is not sortable")]
    UnsortableColumn { table: String, column: usize },

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
