// Provider Reconcile - Core Library
// Identity resolution and merge for provider registry exports.
// Exposes all modules for use in the CLI and tests.

pub mod address;    // Per-country address formats
pub mod normalize;  // Canonical keys: names, addresses, URLs
pub mod entities;   // Organization aggregate
pub mod merge;      // Merge engine
pub mod repository; // Identity repository: SQLite + in-memory
pub mod record;     // Positional input record
pub mod staging;    // Subpart staging between passes
pub mod pipeline;   // Two-pass ingestion
pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{AddressPolicy, Config, MatchPolicy, StagingMode};
pub use entities::{
    Endpoint, IdentifierType, Location, Organization, OrganizationIdentifier, OrganizationType,
};
pub use error::{
    ConfigError, NormalizationError, PipelineError, PipelineResult, RecordError, RepositoryError,
};
pub use merge::{merge, MergeChange, MergeOutcome};
pub use normalize::{normalize_address, normalize_endpoint_id, normalize_name, normalize_url};
pub use pipeline::{PassReport, Pipeline, PipelineReport, RecordOutcome};
pub use record::{columns, FilterReason, Pass, ProviderRecord, RecordPosition};
pub use repository::{InMemoryRepository, OrganizationRepository, SqliteRepository};
pub use staging::StagingSet;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
