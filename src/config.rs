// ⚙️ Configuration - TOML file, every key optional
//
// database_path     = "data/provider-registry.db"
// staging_path      = "data/org_subparts.csv"
// staging           = "file"          # file | memory
// address_policy    = "skip_record"   # skip_record | drop_location
// match_policy      = "first_match"   # first_match | reject_ambiguous
// has_headers       = true
// progress_interval = 100000
// log_filter        = "provider_reconcile=info"

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// POLICIES
// ============================================================================

/// Where subpart records wait between the two passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingMode {
    /// Headerless CSV at `staging_path`
    #[default]
    File,
    Memory,
}

/// What to do with a record whose address cannot be normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPolicy {
    /// Skip the whole record
    #[default]
    SkipRecord,
    /// Keep the record, without its location
    DropLocation,
}

/// How a conflicting candidate is matched to an existing organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// First owner in lookup order wins
    #[default]
    FirstMatch,
    /// Skip candidates whose identifiers point at more than one organization
    RejectAmbiguous,
}

macro_rules! str_enum {
    ($ty:ty { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{}' (expected one of: {})",
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

str_enum!(StagingMode {
    StagingMode::File => "file",
    StagingMode::Memory => "memory",
});

str_enum!(AddressPolicy {
    AddressPolicy::SkipRecord => "skip_record",
    AddressPolicy::DropLocation => "drop_location",
});

str_enum!(MatchPolicy {
    MatchPolicy::FirstMatch => "first_match",
    MatchPolicy::RejectAmbiguous => "reject_ambiguous",
});

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: PathBuf,
    pub staging_path: PathBuf,
    pub staging: StagingMode,
    pub address_policy: AddressPolicy,
    pub match_policy: MatchPolicy,

    /// Registry exports ship with a header row
    pub has_headers: bool,

    /// Log a progress line every N records (0 disables)
    pub progress_interval: u64,

    /// Default tracing filter, used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("data/provider-registry.db"),
            staging_path: PathBuf::from("data/org_subparts.csv"),
            staging: StagingMode::default(),
            address_policy: AddressPolicy::default(),
            match_policy: MatchPolicy::default(),
            has_headers: true,
            progress_interval: 100_000,
            log_filter: "provider_reconcile=info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".to_string()));
        }
        if self.staging == StagingMode::File && self.staging_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "staging_path must be set when staging = \"file\"".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            staging = "memory"
            match_policy = "reject_ambiguous"
            progress_interval = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.staging, StagingMode::Memory);
        assert_eq!(config.match_policy, MatchPolicy::RejectAmbiguous);
        assert_eq!(config.progress_interval, 10);
        // Untouched keys keep defaults
        assert_eq!(config.address_policy, AddressPolicy::SkipRecord);
        assert!(config.has_headers);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("stagin = \"memory\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_enum_value_rejected() {
        assert!(Config::from_toml("address_policy = \"ignore\"").is_err());
    }

    #[test]
    fn test_empty_staging_path_invalid_for_file_mode() {
        let err = Config::from_toml("staging_path = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        // Fine when staging in memory
        assert!(Config::from_toml("staging_path = \"\"\nstaging = \"memory\"").is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = \"/tmp/registry.db\"").unwrap();
        writeln!(file, "has_headers = false").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/registry.db"));
        assert!(!config.has_headers);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("memory".parse::<StagingMode>().unwrap(), StagingMode::Memory);
        assert_eq!("drop_location".parse::<AddressPolicy>().unwrap(), AddressPolicy::DropLocation);
        assert_eq!(MatchPolicy::RejectAmbiguous.to_string(), "reject_ambiguous");
        assert!("sometimes".parse::<MatchPolicy>().is_err());
    }
}
