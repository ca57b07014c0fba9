//! Error types for the chunk store gateway

use thiserror::Error;

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database operation being performed when an error occurred
///
/// Attached to errors so failures are diagnosable without stack traces.
#[derive(Debug, Clone)]
pub enum DatabaseOperation {
    FindDocumentByObjectKey { object_key: String },
    GetDocument { document_id: String },
    UpdateDocumentState { document_id: String },
    InsertChunks { document_id: String },
    DeleteChunks { document_id: String },
    CountChunks { document_id: String },
    VectorSearch { column: &'static str },
    Migrate,
}

impl std::fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FindDocumentByObjectKey { object_key } => {
                write!(f, "find document by object key {object_key}")
            }
            Self::GetDocument { document_id } => write!(f, "get document {document_id}"),
            Self::UpdateDocumentState { document_id } => {
                write!(f, "update document state {document_id}")
            }
            Self::InsertChunks { document_id } => {
                write!(f, "insert chunks for document {document_id}")
            }
            Self::DeleteChunks { document_id } => {
                write!(f, "delete chunks for document {document_id}")
            }
            Self::CountChunks { document_id } => {
                write!(f, "count chunks for document {document_id}")
            }
            Self::VectorSearch { column } => write!(f, "vector search on {column}"),
            Self::Migrate => write!(f, "run migrations"),
        }
    }
}

/// Errors from the chunk store
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Connection or pool acquisition failed
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// A query failed; carries the operation for context
    #[error("Database query failed during {operation}: {message}")]
    Query {
        operation: String,
        message: String,
    },

    /// A uniqueness or FK constraint was violated
    #[error("Constraint violation during {operation}: {message}")]
    ConstraintViolation {
        operation: String,
        message: String,
    },

    /// Expected row was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Migration failure at startup
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Embedding vector had the wrong dimensionality for its column
    #[error("Dimension mismatch for {column}: expected {expected}, got {actual}")]
    DimensionMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Extension trait mapping sqlx errors into [`DatabaseError`] with context
pub trait DatabaseErrorExt<T> {
    /// Attach the operation that was in flight to a failed result
    fn map_db_err(self, operation: &DatabaseOperation) -> DatabaseResult<T>;
}

impl<T> DatabaseErrorExt<T> for Result<T, sqlx::Error> {
    fn map_db_err(self, operation: &DatabaseOperation) -> DatabaseResult<T> {
        self.map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::ConstraintViolation {
                    operation: operation.to_string(),
                    message: db_err.to_string(),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection(e.to_string())
            }
            _ => DatabaseError::Query {
                operation: operation.to_string(),
                message: e.to_string(),
            },
        })
    }
}
