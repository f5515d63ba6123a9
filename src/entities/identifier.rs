// 🔑 Organization Identifier - the matching key space
//
// (identifier_type, value) is globally unique across all organizations.
// Two identifiers are "the same" when that pair matches; the row id and the
// display string never take part in matching.

use crate::normalize::normalize_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// IDENTIFIER TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    /// Registry number of a top-level record (never set for subparts)
    PrimaryRegistryId,

    /// Registry number of any record, including subparts merged into a parent
    RegistryId,

    /// Employer / organization tax number
    TaxId,

    /// Output of `normalize_name` for the legal name or an alias
    NormalizedName,
}

impl IdentifierType {
    pub const ALL: [IdentifierType; 4] = [
        IdentifierType::PrimaryRegistryId,
        IdentifierType::RegistryId,
        IdentifierType::TaxId,
        IdentifierType::NormalizedName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::PrimaryRegistryId => "primary_registry_id",
            IdentifierType::RegistryId => "registry_id",
            IdentifierType::TaxId => "tax_id",
            IdentifierType::NormalizedName => "normalized_name",
        }
    }

    /// Lookup order: most specific first. Names are the weakest evidence.
    pub fn match_priority(&self) -> u8 {
        match self {
            IdentifierType::PrimaryRegistryId => 0,
            IdentifierType::RegistryId => 1,
            IdentifierType::TaxId => 2,
            IdentifierType::NormalizedName => 3,
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentifierType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown identifier type '{}' (expected one of: primary_registry_id, registry_id, tax_id, normalized_name)",
                    s
                )
            })
    }
}

// ============================================================================
// ORGANIZATION IDENTIFIER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationIdentifier {
    /// Row id (UUID), assigned at construction
    pub id: String,

    pub identifier_type: IdentifierType,
    pub value: String,

    /// Human-readable form, e.g. the raw name a NormalizedName came from
    pub display: Option<String>,
}

impl OrganizationIdentifier {
    pub fn new(identifier_type: IdentifierType, value: impl Into<String>, display: Option<String>) -> Self {
        OrganizationIdentifier {
            id: uuid::Uuid::new_v4().to_string(),
            identifier_type,
            value: value.into(),
            display,
        }
    }

    /// NormalizedName identifier for a raw name; the raw name is kept as display.
    pub fn normalized_name(raw_name: &str) -> Self {
        Self::new(
            IdentifierType::NormalizedName,
            normalize_name(raw_name),
            Some(raw_name.to_string()),
        )
    }

    pub fn primary_registry_id(value: &str) -> Self {
        Self::new(IdentifierType::PrimaryRegistryId, value, None)
    }

    pub fn registry_id(value: &str) -> Self {
        Self::new(IdentifierType::RegistryId, value, None)
    }

    pub fn tax_id(value: &str) -> Self {
        Self::new(IdentifierType::TaxId, value, None)
    }

    /// Does this identifier occupy the same (type, value) slot as `other`?
    pub fn same_key(&self, other: &OrganizationIdentifier) -> bool {
        self.identifier_type == other.identifier_type && self.value == other.value
    }

    pub fn key(&self) -> (IdentifierType, &str) {
        (self.identifier_type, self.value.as_str())
    }
}

impl fmt::Display for OrganizationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identifier_type, self.value)
    }
}

/// Render a list of identifiers for log lines and error messages.
pub fn describe_identifiers(identifiers: &[OrganizationIdentifier]) -> String {
    identifiers
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stable sort by match priority; ties keep the caller's order.
pub fn in_match_order(identifiers: &[OrganizationIdentifier]) -> Vec<OrganizationIdentifier> {
    let mut ordered = identifiers.to_vec();
    ordered.sort_by_key(|i| i.identifier_type.match_priority());
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_type_round_trips_through_str() {
        for t in IdentifierType::ALL {
            assert_eq!(t.as_str().parse::<IdentifierType>().unwrap(), t);
        }
        assert!("npi".parse::<IdentifierType>().is_err());
    }

    #[test]
    fn test_normalized_name_keeps_display() {
        let id = OrganizationIdentifier::normalized_name("Acme Clinic");

        assert_eq!(id.identifier_type, IdentifierType::NormalizedName);
        assert_eq!(id.value, "ACME CLINIC");
        assert_eq!(id.display.as_deref(), Some("Acme Clinic"));
    }

    #[test]
    fn test_same_key_ignores_row_id_and_display() {
        let a = OrganizationIdentifier::new(IdentifierType::TaxId, "99-1234567", None);
        let b = OrganizationIdentifier::new(IdentifierType::TaxId, "99-1234567", Some("EIN".into()));
        let c = OrganizationIdentifier::new(IdentifierType::RegistryId, "99-1234567", None);

        assert_ne!(a.id, b.id);
        assert!(a.same_key(&b));
        assert!(!a.same_key(&c));
    }

    #[test]
    fn test_in_match_order_is_stable() {
        let ids = vec![
            OrganizationIdentifier::normalized_name("Acme"),
            OrganizationIdentifier::tax_id("1"),
            OrganizationIdentifier::normalized_name("Acme Alias"),
            OrganizationIdentifier::registry_id("2"),
            OrganizationIdentifier::primary_registry_id("2"),
        ];

        let ordered: Vec<String> = in_match_order(&ids).iter().map(|i| i.to_string()).collect();
        assert_eq!(
            ordered,
            vec![
                "primary_registry_id=2",
                "registry_id=2",
                "tax_id=1",
                "normalized_name=ACME",
                "normalized_name=ACME ALIAS",
            ]
        );
    }
}
