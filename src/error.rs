// ⚠️ Error taxonomy
//
// Three tiers, plus config:
// - NormalizationError / RecordError: bad data in one record, logged and skipped
// - RepositoryError: what the storage collaborator reports (conflicts drive merges)
// - PipelineError: aborts the whole run

use crate::record::RecordPosition;
use thiserror::Error;

// ============================================================================
// NORMALIZATION
// ============================================================================

/// A record field could not be turned into a canonical matching key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("name '{0}' has no characters left to match on")]
    EmptyName(String),

    #[error("address has no country code")]
    MissingCountry,

    #[error("unsupported country code '{0}'")]
    UnsupportedCountry(String),

    #[error("{country} address is missing required field '{field}'")]
    MissingField {
        country: String,
        field: &'static str,
    },

    #[error("'{postal_code}' is not a valid {country} postal code")]
    InvalidPostalCode {
        country: String,
        postal_code: String,
    },
}

// ============================================================================
// STORAGE
// ============================================================================

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A (type, value) identifier or the organization id is already taken
    #[error("identifier conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Update of an organization that was never created
    #[error("organization '{0}' does not exist")]
    Missing(String),

    #[error("corrupt stored row: {0}")]
    Corrupt(String),
}

impl RepositoryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }
}

// ============================================================================
// PER-RECORD (recoverable)
// ============================================================================

/// A record that cannot be reconciled. The pipeline logs it and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("create conflicted but no organization owns any of: {identifiers}")]
    NotFound { identifiers: String },

    #[error("identifiers resolve to {} distinct organizations: {}", .owners.len(), .owners.join(", "))]
    AmbiguousMatch { owners: Vec<String> },

    #[error("merged identifier already belongs to another organization: {0}")]
    UpdateConflict(String),
}

// ============================================================================
// PIPELINE (fatal)
// ============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open registry file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error(
        "consistency error at {position}: no parent organization found for subpart '{name}' \
         (looked up {identifiers}); the primary pass did not complete or staging is stale"
    )]
    Consistency {
        position: RecordPosition,
        name: String,
        identifiers: String,
    },

    #[error("failed to read record at {position}: {source}")]
    Read {
        position: RecordPosition,
        #[source]
        source: csv::Error,
    },

    #[error("failed to stage subpart record at {position}: {source}")]
    StagingWrite {
        position: RecordPosition,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush staged record at {position}: {source}")]
    StagingFlush {
        position: RecordPosition,
        #[source]
        source: std::io::Error,
    },

    #[error("staging file error on {path}: {source}")]
    StagingIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage failure at {position}: {source}")]
    Storage {
        position: RecordPosition,
        #[source]
        source: RepositoryError,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
