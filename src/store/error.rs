use thiserror::Error;

/// Failures surfaced by target store operations.
///
/// Read failures never appear here: `load` degrades to an empty record set
/// instead, since the targets file may legitimately not exist yet. Write
/// failures are always surfaced so a lost mutation is never reported as
/// successful.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed or empty required input. The caller must fix the request.
    #[error("{0}")]
    Validation(String),

    /// A record with the same target address already exists.
    #[error("host {0} already exists")]
    Conflict(String),

    /// No record matched the given id.
    #[error("host not found")]
    NotFound,

    /// Reading or writing the targets file failed.
    #[error("failed to persist targets file: {0}")]
    Persistence(String),

    /// The store thread is gone and can no longer answer commands.
    #[error("store worker unavailable")]
    Unavailable,
}
