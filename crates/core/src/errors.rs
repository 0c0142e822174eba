use thiserror::Error;

/// Unified error type for the entire portfolio-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Quote Source / Network ──────────────────────────────────────
    #[error("Quote source failure ({provider}): {message}")]
    ExternalSourceFailure { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Batch partially failed: {failed} of {total} items failed")]
    PartialFailure { failed: usize, total: usize },

    // ── Storage / Snapshot ──────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

/// Coarse classification of a [`CoreError`], for callers that map failures
/// onto transport-level status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    ExternalSourceFailure,
    PartialFailure,
    Storage,
}

impl CoreError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidState(_) => ErrorKind::InvalidState,
            CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::ExternalSourceFailure { .. } | CoreError::Network(_) => {
                ErrorKind::ExternalSourceFailure
            }
            CoreError::PartialFailure { .. } => ErrorKind::PartialFailure,
            CoreError::Storage(_)
            | CoreError::InvalidFileFormat(_)
            | CoreError::UnsupportedVersion(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_)
            | CoreError::FileIO(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller may reasonably retry the whole operation.
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ExternalSourceFailure
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs, and Alpha Vantage keys travel
        // in the query string.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
