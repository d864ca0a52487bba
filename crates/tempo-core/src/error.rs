use std::fmt;
use std::io;

use crate::interval::ParseError;

/// Machine-readable error codes for scripts and log processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConsistencyViolation,
    CorruptRecord,
    StorageIo,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConsistencyViolation => "E3001",
            Self::CorruptRecord => "E3002",
            Self::StorageIo => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConsistencyViolation => "Store consistency violation",
            Self::CorruptRecord => "Corrupt interval record",
            Self::StorageIo => "Storage I/O failed",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConsistencyViolation => {
                Some("Run `tempo export` to check which intervals are stored.")
            }
            Self::CorruptRecord => Some("Fix or remove the offending line in the data file."),
            Self::StorageIo => {
                Some("Check that the store directory is readable and writable and has free space.")
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the interval store.
///
/// Parse errors in the persisted tag index never reach callers; the store
/// rebuilds the index instead. Everything here aborts the current operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An internal invariant was broken, e.g. deleting an interval that no
    /// data file holds.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// A stored record could not be read back.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Filesystem failure from a data file, the journal, or the tag index.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Consistency(_) => ErrorCode::ConsistencyViolation,
            Self::Parse(_) => ErrorCode::CorruptRecord,
            Self::Io(_) => ErrorCode::StorageIo,
        }
    }

    /// Optional remediation hint for the user.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, StoreError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConsistencyViolation,
            ErrorCode::CorruptRecord,
            ErrorCode::StorageIo,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::ConsistencyViolation.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn store_error_maps_to_code() {
        let err = StoreError::Consistency("missing".into());
        assert_eq!(err.code(), ErrorCode::ConsistencyViolation);
        assert!(err.to_string().contains("missing"));

        let io = StoreError::from(std::io::Error::other("disk"));
        assert_eq!(io.code(), ErrorCode::StorageIo);
    }

    #[test]
    fn read_failures_are_not_reported_as_writes() {
        let read = StoreError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(read.code().message(), "Storage I/O failed");
        assert!(read.hint().is_some_and(|hint| hint.contains("readable")));
        assert!(!read.code().message().contains("write"));
    }
}
