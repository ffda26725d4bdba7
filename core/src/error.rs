use thiserror::Error;

/// Errors surfaced by corpus loading and query execution.
///
/// Per-document anomalies during indexing (oversized content, missing text)
/// are logged and degraded locally instead of being raised through this type.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The corpus being loaded is structurally invalid. Raised before any
    /// state is published, so a failed reload leaves the serving corpus
    /// untouched.
    #[error("corpus validation failed: {0}")]
    Validation(String),

    /// A query or statistics request arrived before any corpus was loaded.
    #[error("no corpus has been loaded")]
    NotLoaded,

    /// A requested filter value is not a recognized member of its enum.
    #[error("unknown {field} filter value: {value}")]
    InvalidFilter { field: &'static str, value: String },
}
