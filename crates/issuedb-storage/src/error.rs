//! Storage error types.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "issue", "config").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An issue is already claimed by another assignee.
    #[error("issue already claimed by {assignee}")]
    AlreadyClaimed {
        /// Current assignee who holds the claim.
        assignee: String,
    },

    /// The database has not been initialized.
    #[error("database not initialized: {reason}")]
    Initialization {
        /// Why the database is considered uninitialized.
        reason: String,
    },

    /// An issue ID does not match the configured prefix.
    #[error("issue {id} does not match configured prefix {prefix}")]
    PrefixMismatch {
        /// The issue ID.
        id: String,
        /// The expected prefix.
        prefix: String,
    },

    /// A validation constraint was violated.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// A dependency or parent reference points at an issue that does not exist.
    #[error("{entity} {id} references nonexistent issue {target}")]
    Orphan {
        /// The kind of entity holding the dangling reference.
        entity: String,
        /// The entity's own id.
        id: String,
        /// The issue id it points at that does not exist.
        target: String,
    },

    /// Adding a dependency would create a cycle in the dependency graph.
    #[error("adding this dependency would create a cycle")]
    CycleDetected,

    /// The database is locked by another process or reader/writer.
    #[error("database locked: {0}")]
    LockBusy(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed for a reason that is not retryable.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A transaction failed for a reason classified as transient by the
    /// retry loop; retrying the same operation may succeed.
    #[error("transient error: {0}")]
    Transient(String),

    /// A server-mode connection returned a response the client could not
    /// parse as a well-formed result set (embedded-mode never raises this).
    #[error("malformed server response: {0}")]
    TransientServerFormat(String),

    /// A server-mode query or connection failure from the MySQL-protocol
    /// driver. Classified retryable/non-retryable by message text, the same
    /// way the transaction runner classifies commit failures.
    #[error("server error: {0}")]
    ServerQuery(String),

    /// A transaction function ran to completion without performing any
    /// mutation; filtered out at the retry boundary before reaching a caller.
    #[error("transaction had nothing to commit")]
    NothingToCommit,

    /// The operation was cancelled by the caller before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation exceeded its configured deadline (query timeout or
    /// watchdog kill in server mode).
    #[error("operation exceeded its deadline")]
    DeadlineExceeded,

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StorageError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry (e.g., database locked, connection errors, optimistic lock
    /// conflicts classified by the transaction runner).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockBusy(_) | Self::Connection(_) | Self::Transient(_) => true,
            Self::ServerQuery(message) => classify_connection_error(message),
            _ => false,
        }
    }
}

/// Classifies a raw commit-failure message as a retryable serialization
/// conflict (the versioned backend's "optimistic lock failed" signal, or the
/// equivalent MySQL error codes), as opposed to a "nothing to commit" no-op
/// or an unrelated, non-retryable failure.
///
/// `1105` is overloaded by the backend: the same code carries both the
/// optimistic-lock message and the nothing-to-commit no-op signal, so the
/// message text (not just the code) has to be inspected.
pub fn classify_commit_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if lower.contains("nothing to commit") {
        return false;
    }
    lower.contains("optimistic lock failed")
        || lower.contains("error 1213")
        || (lower.contains("error 1105") && lower.contains("optimistic lock"))
}

/// Classifies a raw connection-failure message as retryable in server mode.
/// "connection refused" is deliberately excluded: the server is simply not
/// listening, and retrying immediately will not help.
pub fn classify_connection_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if lower.contains("connection refused") {
        return false;
    }
    lower.contains("driver: bad connection")
        || lower.contains("invalid connection")
        || lower.contains("broken pipe")
        || lower.contains("connection reset")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_error_classification() {
        assert!(classify_commit_error("optimistic lock failed"));
        assert!(classify_commit_error("Error 1213: Deadlock found"));
        assert!(classify_commit_error(
            "Error 1105: optimistic lock failed on cell"
        ));
        assert!(!classify_commit_error(
            "Error 1105: nothing to commit"
        ));
        assert!(!classify_commit_error("table does not exist"));
        assert!(!classify_commit_error("connection refused"));
    }

    #[test]
    fn connection_error_classification() {
        assert!(classify_connection_error("driver: bad connection"));
        assert!(classify_connection_error("invalid connection"));
        assert!(classify_connection_error("broken pipe"));
        assert!(classify_connection_error("connection reset by peer"));
        assert!(!classify_connection_error("connection refused"));
        assert!(!classify_connection_error("table does not exist"));
    }

    #[test]
    fn server_query_error_retryable_by_message() {
        assert!(StorageError::ServerQuery("broken pipe".into()).is_retryable());
        assert!(!StorageError::ServerQuery("connection refused".into()).is_retryable());
        assert!(!StorageError::ServerQuery("syntax error".into()).is_retryable());
    }
}
