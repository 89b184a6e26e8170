/// Errors returned by store operations.
///
/// Validation failures (e.g. an empty keep-set for a location cleanup)
/// are distinct from database errors so the transport layer can map
/// them to 400 instead of 500.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}
