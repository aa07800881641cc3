//! Error types for the record-store boundary

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error type for operations against the backing store
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while connecting to the store
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while executing a query
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
