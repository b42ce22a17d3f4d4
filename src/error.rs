//! Errors surfaced by [`EntryStore`](crate::store::EntryStore) operations.

use thiserror::Error;

/// What a store operation can report back to its caller.
///
/// Blank text and unknown ids are not errors: those operations are
/// silent no-ops. An empty collection at export time is an
/// [`ExportOutcome`](crate::store::ExportOutcome), not an error either.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Retype asked for a category outside the fixed set.
    #[error("invalid category: {0:?}")]
    InvalidCategory(String),

    /// The transport rejected the export; nothing was cleared.
    #[error("export failed: {0:#}")]
    ExportFailed(anyhow::Error),

    /// The persistence collaborator could not read or write.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = StoreError::InvalidCategory("bogus".into());
        assert_eq!(err.to_string(), "invalid category: \"bogus\"");

        let err = StoreError::ExportFailed(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "export failed: connection refused");
    }

    #[test]
    fn storage_errors_convert_from_anyhow() {
        fn failing() -> StoreResult<()> {
            let write: anyhow::Result<()> = Err(anyhow::anyhow!("disk full"));
            write?;
            Ok(())
        }

        match failing() {
            Err(StoreError::Storage(e)) => assert_eq!(e.to_string(), "disk full"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
