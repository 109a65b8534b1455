use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Everything that can go wrong while ingesting one unit of work.
///
/// The retryable variants signal expected races between concurrent units
/// processing the same image; they resolve on a later attempt. Everything
/// else is terminal for the current unit and is recorded into its failure
/// log rather than propagated further.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The inbound message is unusable: required fields missing or the
    /// resolved repository identity is empty. The sole error that aborts
    /// processing with no persisted unit record.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A vulnerability match referenced a package that no SBOM merge has
    /// established yet for this image.
    #[error("dependency not yet merged: {0}")]
    DependencyMissing(String),

    /// Two units raced to create the same natural-key row; re-reading
    /// observes the winner.
    #[error("natural-key conflict: {0}")]
    Conflict(String),

    /// Lock contention or connection trouble at the store.
    #[error("transient store failure: {0}")]
    Transient(#[source] DbErr),

    /// Any other store error.
    #[error("store error: {0}")]
    Store(#[source] DbErr),

    /// Stored state contradicts what this unit is trying to record.
    #[error("conflicting stored state: {0}")]
    ConflictingInfo(String),

    /// The requested platform variant of an image is not published.
    /// Expected for multi-arch guesses; the caller moves on.
    #[error("platform variant not published: {0}")]
    VariantMissing(String),

    /// The image could not be fetched at all.
    #[error("image fetch failed: {0}")]
    ImageFetch(String),

    #[error("scanner `{tool}` timed out after {seconds}s")]
    ScannerTimeout { tool: String, seconds: u64 },

    #[error("scanner `{tool}` failed: {stderr}")]
    Scanner { tool: String, stderr: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document parse error: {0}")]
    Document(#[from] serde_json::Error),

    /// A bounded retry spent all its attempts; carries the last failure.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Classify a store error: unique-key violations become retryable
    /// conflicts, connection/contention trouble becomes retryable transients,
    /// the rest is terminal.
    pub fn from_db(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => IngestError::Conflict(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => IngestError::Conflict(msg),
            _ => match &err {
                DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => IngestError::Transient(err),
                _ if is_contention(&err) => IngestError::Transient(err),
                _ => IngestError::Store(err),
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, IngestError::Conflict(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transient(_))
    }

    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, IngestError::DependencyMissing(_))
    }
}

// Postgres reports deadlocks and lock timeouts as plain query errors; the
// SQLSTATE is buried in the message.
fn is_contention(err: &DbErr) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("deadlock") || text.contains("lock timeout") || text.contains("lock_timeout")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_text_classifies_as_transient() {
        let err = DbErr::Custom("deadlock detected".into());
        assert!(IngestError::from_db(err).is_transient());
    }

    #[test]
    fn plain_query_error_is_terminal() {
        let err = DbErr::Custom("syntax error at or near".into());
        let classified = IngestError::from_db(err);
        assert!(!classified.is_transient());
        assert!(!classified.is_conflict());
    }
}
