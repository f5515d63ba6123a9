// 🏥 Organization Entity - aggregate root of the provider registry
//
// "The registry number is IDENTITY when we have one; names are VALUES that pile up as aliases"
//
// An organization owns its identifiers, locations and endpoints. It always
// carries at least one NormalizedName identifier (added by `new`).

use super::endpoint::Endpoint;
use super::identifier::{in_match_order, IdentifierType, OrganizationIdentifier};
use super::location::Location;
use crate::normalize::normalize_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

// ============================================================================
// ORGANIZATION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    /// Entity type code "1" - a person (possibly a sole proprietor)
    Individual,

    /// Entity type code "2"
    Organization,
}

impl OrganizationType {
    /// Map the registry's entity type code. Anything else is unknown.
    pub fn from_entity_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(OrganizationType::Individual),
            "2" => Some(OrganizationType::Organization),
            _ => None,
        }
    }

    pub fn entity_code(&self) -> &'static str {
        match self {
            OrganizationType::Individual => "1",
            OrganizationType::Organization => "2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Individual => "individual",
            OrganizationType::Organization => "organization",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(OrganizationType::Individual),
            "organization" => Some(OrganizationType::Organization),
            _ => None,
        }
    }
}

// ============================================================================
// ORGANIZATION ENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    /// Registry number when known, otherwise `name_key` of the normalized name
    pub id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub organization_type: Option<OrganizationType>,

    /// Display name as first seen. Never overwritten by a merge.
    pub name: String,

    /// Provider taxonomy codes
    pub taxonomy: BTreeSet<String>,

    pub is_sole_proprietor: bool,
    pub related_urls: BTreeSet<String>,

    // ========================================================================
    // OWNED COLLECTIONS (append-only)
    // ========================================================================
    pub identifiers: Vec<OrganizationIdentifier>,
    pub locations: Vec<Location>,
    pub endpoints: Vec<Endpoint>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create an organization with its primary NormalizedName identifier.
    ///
    /// The id is the registry number when one is given (non-blank), else a
    /// key derived from the normalized name.
    pub fn new(registry_id: Option<&str>, organization_type: Option<OrganizationType>, name: &str) -> Self {
        let name_identifier = OrganizationIdentifier::normalized_name(name);
        let id = match registry_id.map(str::trim).filter(|r| !r.is_empty()) {
            Some(registry_id) => registry_id.to_string(),
            None => name_key(&name_identifier.value),
        };
        let now = Utc::now();

        Organization {
            id,
            organization_type,
            name: name.to_string(),
            taxonomy: BTreeSet::new(),
            is_sole_proprietor: false,
            related_urls: BTreeSet::new(),
            identifiers: vec![name_identifier],
            locations: Vec::new(),
            endpoints: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder pattern: add an identifier (ignored when the (type, value) slot is taken)
    pub fn with_identifier(mut self, identifier: OrganizationIdentifier) -> Self {
        self.add_identifier(identifier);
        self
    }

    /// Builder pattern: add taxonomy codes (blank codes are skipped)
    pub fn with_taxonomy<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for code in codes {
            let code: String = code.into();
            if !code.trim().is_empty() {
                self.taxonomy.insert(code);
            }
        }
        self
    }

    /// Builder pattern: add a location
    pub fn with_location(mut self, location: Location) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }

    /// Builder pattern: add an endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        if !self.endpoints.contains(&endpoint) {
            self.endpoints.push(endpoint);
        }
        self
    }

    /// Builder pattern: add a related URL
    pub fn with_related_url(mut self, url: &str) -> Self {
        self.related_urls.insert(url.to_string());
        self
    }

    /// Builder pattern: set sole proprietor flag
    pub fn with_sole_proprietor(mut self, is_sole_proprietor: bool) -> Self {
        self.is_sole_proprietor = is_sole_proprietor;
        self
    }

    /// Normalized form of the display name
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn is_individual(&self) -> bool {
        self.organization_type == Some(OrganizationType::Individual)
    }

    pub fn has_identifier(&self, identifier_type: IdentifierType, value: &str) -> bool {
        self.identifiers
            .iter()
            .any(|i| i.identifier_type == identifier_type && i.value == value)
    }

    /// Append an identifier unless its (type, value) is already present.
    /// Returns true when it was added.
    pub fn add_identifier(&mut self, identifier: OrganizationIdentifier) -> bool {
        if self.has_identifier(identifier.identifier_type, &identifier.value) {
            return false;
        }
        self.identifiers.push(identifier);
        true
    }

    pub fn identifiers_of(&self, identifier_type: IdentifierType) -> impl Iterator<Item = &OrganizationIdentifier> {
        self.identifiers
            .iter()
            .filter(move |i| i.identifier_type == identifier_type)
    }

    /// Identifiers in the order they should be tried against the repository
    pub fn lookup_order(&self) -> Vec<OrganizationIdentifier> {
        in_match_order(&self.identifiers)
    }
}

/// Fallback id for organizations without a registry number.
///
/// Format: `name:` + first 16 hex digits of SHA-256(normalized name)
pub fn name_key(normalized_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("name:{}", &digest[..16])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_creation() {
        let org = Organization::new(
            Some("1234567890"),
            Some(OrganizationType::Organization),
            "Acme Clinic",
        );

        assert_eq!(org.id, "1234567890");
        assert_eq!(org.name, "Acme Clinic");
        assert_eq!(org.identifiers.len(), 1);
        assert!(org.has_identifier(IdentifierType::NormalizedName, "ACME CLINIC"));
        assert!(!org.is_individual());
    }

    #[test]
    fn test_organization_without_registry_id_uses_name_key() {
        let a = Organization::new(None, None, "Acme Clinic");
        let b = Organization::new(Some("  "), None, "ACME-CLINIC");

        assert!(a.id.starts_with("name:"));
        assert_eq!(a.id.len(), "name:".len() + 16);
        // Same normalized name → same key
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_add_identifier_dedups_on_type_and_value() {
        let mut org = Organization::new(Some("1"), None, "Acme");

        assert!(org.add_identifier(OrganizationIdentifier::tax_id("99")));
        assert!(!org.add_identifier(OrganizationIdentifier::tax_id("99")));
        assert!(org.add_identifier(OrganizationIdentifier::registry_id("99")));
        assert_eq!(org.identifiers.len(), 3);
    }

    #[test]
    fn test_with_taxonomy_skips_blank_and_dedups() {
        let org = Organization::new(Some("1"), None, "Acme")
            .with_taxonomy(vec!["207Q00000X", "", "207Q00000X", "  ", "261QP2300X"]);

        assert_eq!(org.taxonomy.len(), 2);
        assert_eq!(
            org.taxonomy.iter().cloned().collect::<Vec<_>>(),
            vec!["207Q00000X".to_string(), "261QP2300X".to_string()]
        );
    }

    #[test]
    fn test_lookup_order_puts_registry_ids_first() {
        let org = Organization::new(Some("1234567890"), Some(OrganizationType::Organization), "Acme")
            .with_identifier(OrganizationIdentifier::primary_registry_id("1234567890"))
            .with_identifier(OrganizationIdentifier::registry_id("1234567890"))
            .with_identifier(OrganizationIdentifier::tax_id("99-1234567"));

        let order: Vec<IdentifierType> = org.lookup_order().iter().map(|i| i.identifier_type).collect();
        assert_eq!(
            order,
            vec![
                IdentifierType::PrimaryRegistryId,
                IdentifierType::RegistryId,
                IdentifierType::TaxId,
                IdentifierType::NormalizedName,
            ]
        );
    }

    #[test]
    fn test_organization_type_codes() {
        assert_eq!(OrganizationType::from_entity_code("1"), Some(OrganizationType::Individual));
        assert_eq!(OrganizationType::from_entity_code("2"), Some(OrganizationType::Organization));
        assert_eq!(OrganizationType::from_entity_code("3"), None);
        assert_eq!(OrganizationType::from_entity_code(""), None);

        for t in [OrganizationType::Individual, OrganizationType::Organization] {
            assert_eq!(OrganizationType::parse(t.as_str()), Some(t));
            assert_eq!(OrganizationType::from_entity_code(t.entity_code()), Some(t));
        }
    }
}
