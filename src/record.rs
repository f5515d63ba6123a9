// 📄 Provider Record - one row of the registry export
//
// Columns are positional (0-indexed). Short rows are fine: a missing column
// reads as empty. Everything the pipeline needs from a row goes through
// here: filtering, subpart routing, and building the candidate organization.

use crate::config::AddressPolicy;
use crate::entities::{Location, Organization, OrganizationIdentifier, OrganizationType};
use crate::error::NormalizationError;
use crate::normalize::normalize_name;
use csv::StringRecord;
use std::fmt;
use tracing::warn;

/// Positions of the columns we read
pub mod columns {
    pub const REGISTRY_ID: usize = 0;
    pub const ENTITY_TYPE: usize = 1;
    pub const TAX_ID: usize = 3;
    pub const ORGANIZATION_NAME: usize = 4;

    pub const LAST_NAME: usize = 5;
    pub const FIRST_NAME: usize = 6;
    pub const MIDDLE_NAME: usize = 7;
    pub const NAME_PREFIX: usize = 8;
    pub const NAME_SUFFIX: usize = 9;

    pub const OTHER_ORGANIZATION_NAME: usize = 11;
    pub const OTHER_LAST_NAME: usize = 13;
    pub const OTHER_FIRST_NAME: usize = 14;
    pub const OTHER_MIDDLE_NAME: usize = 15;
    pub const OTHER_NAME_PREFIX: usize = 16;
    pub const OTHER_NAME_SUFFIX: usize = 17;

    // Business practice location
    pub const ADDRESS_LINE_1: usize = 28;
    pub const ADDRESS_LINE_2: usize = 29;
    pub const CITY: usize = 30;
    pub const STATE: usize = 31;
    pub const POSTAL_CODE: usize = 32;
    pub const COUNTRY: usize = 33;

    pub const DEACTIVATION_REASON: usize = 38;

    /// Taxonomy code 1..15; each slot is followed by three unrelated columns
    pub const TAXONOMY_CODES: [usize; 15] = [47, 51, 55, 59, 63, 67, 71, 75, 79, 83, 87, 91, 95, 99, 103];

    pub const SOLE_PROPRIETOR: usize = 307;
    pub const SUBPART: usize = 308;
    pub const PARENT_ORGANIZATION_NAME: usize = 309;
    pub const PARENT_TAX_ID: usize = 310;

    /// Taxonomy group 1..15
    pub const TAXONOMY_GROUPS: std::ops::RangeInclusive<usize> = 314..=328;

    /// Columns in a full registry row
    pub const RECORD_WIDTH: usize = 330;
}

// ============================================================================
// POSITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Pass 1: every input row
    Primary,
    /// Pass 2: staged subpart rows
    Subpart,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Primary => f.write_str("pass 1"),
            Pass::Subpart => f.write_str("pass 2"),
        }
    }
}

/// Where a record came from, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPosition {
    pub pass: Pass,
    /// Input path (or staging path in pass 2)
    pub source: String,
    /// 1-based line number in `source`
    pub line: u64,
}

impl RecordPosition {
    pub fn new(pass: Pass, source: impl Into<String>, line: u64) -> Self {
        RecordPosition {
            pass,
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.source, self.line, self.pass)
    }
}

// ============================================================================
// FILTERING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    Deactivated,
    MissingEntityType,
    MissingName,
}

impl FilterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterReason::Deactivated => "deactivated",
            FilterReason::MissingEntityType => "missing_entity_type",
            FilterReason::MissingName => "missing_name",
        }
    }
}

// ============================================================================
// PROVIDER RECORD
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProviderRecord {
    pub record: StringRecord,
    pub position: RecordPosition,
}

impl ProviderRecord {
    pub fn new(record: StringRecord, position: RecordPosition) -> Self {
        ProviderRecord { record, position }
    }

    /// Trimmed field; absent columns are empty
    pub fn field(&self, column: usize) -> &str {
        self.record.get(column).unwrap_or("").trim()
    }

    pub fn registry_id(&self) -> &str {
        self.field(columns::REGISTRY_ID)
    }

    pub fn entity_type(&self) -> &str {
        self.field(columns::ENTITY_TYPE)
    }

    pub fn tax_id(&self) -> &str {
        self.field(columns::TAX_ID)
    }

    pub fn is_subpart(&self) -> bool {
        self.field(columns::SUBPART) == "Y"
    }

    pub fn is_sole_proprietor(&self) -> bool {
        self.field(columns::SOLE_PROPRIETOR) == "Y"
    }

    fn is_organization(&self) -> bool {
        self.entity_type() == OrganizationType::Organization.entity_code()
    }

    /// Why this record should be dropped, checked in this order
    pub fn filter_reason(&self) -> Option<FilterReason> {
        if !self.field(columns::DEACTIVATION_REASON).is_empty() {
            return Some(FilterReason::Deactivated);
        }
        if self.entity_type().is_empty() {
            return Some(FilterReason::MissingEntityType);
        }
        if self.field(columns::ORGANIZATION_NAME).is_empty() && self.field(columns::LAST_NAME).is_empty() {
            return Some(FilterReason::MissingName);
        }
        None
    }

    fn join_parts(&self, parts: &[usize]) -> String {
        parts
            .iter()
            .map(|&c| self.field(c))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Legal name for organizations; prefix first middle last suffix for people
    pub fn display_name(&self) -> String {
        if self.is_organization() {
            self.field(columns::ORGANIZATION_NAME).to_string()
        } else {
            self.join_parts(&[
                columns::NAME_PREFIX,
                columns::FIRST_NAME,
                columns::MIDDLE_NAME,
                columns::LAST_NAME,
                columns::NAME_SUFFIX,
            ])
        }
    }

    /// "Other name" of the provider, if any
    pub fn alias(&self) -> Option<String> {
        let alias = if self.is_organization() {
            self.field(columns::OTHER_ORGANIZATION_NAME).to_string()
        } else {
            self.join_parts(&[
                columns::OTHER_NAME_PREFIX,
                columns::OTHER_FIRST_NAME,
                columns::OTHER_MIDDLE_NAME,
                columns::OTHER_LAST_NAME,
                columns::OTHER_NAME_SUFFIX,
            ])
        };
        if alias.is_empty() {
            None
        } else {
            Some(alias)
        }
    }

    /// Non-empty taxonomy codes followed by non-empty taxonomy groups
    pub fn taxonomy_codes(&self) -> Vec<String> {
        columns::TAXONOMY_CODES
            .iter()
            .copied()
            .chain(columns::TAXONOMY_GROUPS)
            .map(|c| self.field(c))
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Business practice location. `Ok(None)` when every address column is blank.
    pub fn location(&self) -> Result<Option<Location>, NormalizationError> {
        let address_columns = columns::ADDRESS_LINE_1..=columns::COUNTRY;
        if address_columns.into_iter().all(|c| self.field(c).is_empty()) {
            return Ok(None);
        }

        Location::new(
            vec![
                self.field(columns::ADDRESS_LINE_1).to_string(),
                self.field(columns::ADDRESS_LINE_2).to_string(),
            ],
            self.field(columns::CITY),
            self.field(columns::STATE),
            self.field(columns::POSTAL_CODE),
            self.field(columns::COUNTRY),
        )
        .map(Some)
    }

    /// Build the candidate organization for this row. Fails with
    /// `EmptyName` when the name has nothing left after normalization.
    ///
    /// Identifiers: NormalizedName (+ alias when it normalizes differently),
    /// PrimaryRegistryID + RegistryID (RegistryID only for subparts), TaxID.
    pub fn to_candidate(&self, address_policy: AddressPolicy) -> Result<Organization, NormalizationError> {
        let name = self.display_name();
        // An empty key would match every other nameless record
        if normalize_name(&name).trim().is_empty() {
            return Err(NormalizationError::EmptyName(name));
        }
        let registry_id = self.registry_id();

        let mut org = Organization::new(
            Some(registry_id),
            OrganizationType::from_entity_code(self.entity_type()),
            &name,
        )
        .with_taxonomy(self.taxonomy_codes())
        .with_sole_proprietor(self.is_sole_proprietor());

        if let Some(alias) = self.alias() {
            let alias_identifier = OrganizationIdentifier::normalized_name(&alias);
            if !alias_identifier.value.trim().is_empty() {
                org.add_identifier(alias_identifier);
            }
        }

        if !registry_id.is_empty() {
            if !self.is_subpart() {
                org.add_identifier(OrganizationIdentifier::primary_registry_id(registry_id));
            }
            org.add_identifier(OrganizationIdentifier::registry_id(registry_id));
        }

        if !self.tax_id().is_empty() {
            org.add_identifier(OrganizationIdentifier::tax_id(self.tax_id()));
        }

        match self.location() {
            Ok(Some(location)) => org = org.with_location(location),
            Ok(None) => {}
            Err(err) => match address_policy {
                AddressPolicy::SkipRecord => return Err(err),
                AddressPolicy::DropLocation => {
                    warn!(position = %self.position, registry_id, error = %err, "dropping unnormalizable location");
                }
            },
        }

        Ok(org)
    }

    /// Identifiers pointing at the parent of a subpart: its tax id and legal name
    pub fn parent_identifiers(&self) -> Vec<OrganizationIdentifier> {
        let mut identifiers = Vec::new();

        let parent_tax_id = self.field(columns::PARENT_TAX_ID);
        if !parent_tax_id.is_empty() {
            identifiers.push(OrganizationIdentifier::tax_id(parent_tax_id));
        }

        let parent_name = self.field(columns::PARENT_ORGANIZATION_NAME);
        if !parent_name.is_empty() {
            let identifier = OrganizationIdentifier::normalized_name(parent_name);
            if !identifier.value.trim().is_empty() {
                identifiers.push(identifier);
            }
        }

        identifiers
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::IdentifierType;

    fn row(fields: &[(usize, &str)]) -> ProviderRecord {
        let mut values = vec![String::new(); columns::RECORD_WIDTH];
        for (column, value) in fields {
            values[*column] = value.to_string();
        }
        ProviderRecord::new(
            StringRecord::from(values),
            RecordPosition::new(Pass::Primary, "test.csv", 2),
        )
    }

    fn acme_fields() -> Vec<(usize, &'static str)> {
        vec![
            (columns::REGISTRY_ID, "1234567890"),
            (columns::ENTITY_TYPE, "2"),
            (columns::TAX_ID, "99-1234567"),
            (columns::ORGANIZATION_NAME, "Acme Clinic"),
            (columns::ADDRESS_LINE_1, "123 Main St"),
            (columns::CITY, "Springfield"),
            (columns::STATE, "IL"),
            (columns::POSTAL_CODE, "123456789"),
            (columns::COUNTRY, "US"),
        ]
    }

    fn keys(org: &Organization) -> Vec<(IdentifierType, String)> {
        let mut keys: Vec<_> = org
            .identifiers
            .iter()
            .map(|i| (i.identifier_type, i.value.clone()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_organization_candidate() {
        let org = row(&acme_fields()).to_candidate(AddressPolicy::SkipRecord).unwrap();

        assert_eq!(org.id, "1234567890");
        assert_eq!(org.organization_type, Some(OrganizationType::Organization));
        assert_eq!(
            keys(&org),
            vec![
                (IdentifierType::PrimaryRegistryId, "1234567890".to_string()),
                (IdentifierType::RegistryId, "1234567890".to_string()),
                (IdentifierType::TaxId, "99-1234567".to_string()),
                (IdentifierType::NormalizedName, "ACME CLINIC".to_string()),
            ]
        );
        assert_eq!(org.locations.len(), 1);
        assert_eq!(org.locations[0].id, "123 MAIN ST,SPRINGFIELD, IL 12345,UNITED STATES");
    }

    #[test]
    fn test_subpart_gets_registry_id_only() {
        let mut fields = acme_fields();
        fields.push((columns::SUBPART, "Y"));
        let record = row(&fields);

        assert!(record.is_subpart());
        let org = record.to_candidate(AddressPolicy::SkipRecord).unwrap();
        assert_eq!(org.identifiers_of(IdentifierType::PrimaryRegistryId).count(), 0);
        assert_eq!(org.identifiers_of(IdentifierType::RegistryId).count(), 1);
    }

    #[test]
    fn test_organization_alias() {
        let mut fields = acme_fields();
        fields.push((columns::OTHER_ORGANIZATION_NAME, "Acme Urgent Care"));
        let org = row(&fields).to_candidate(AddressPolicy::SkipRecord).unwrap();

        assert!(org.has_identifier(IdentifierType::NormalizedName, "ACME URGENT CARE"));
        assert_eq!(org.name, "Acme Clinic");
    }

    #[test]
    fn test_alias_that_normalizes_to_name_is_not_duplicated() {
        let mut fields = acme_fields();
        fields.push((columns::OTHER_ORGANIZATION_NAME, "ACME-CLINIC"));
        let org = row(&fields).to_candidate(AddressPolicy::SkipRecord).unwrap();

        assert_eq!(org.identifiers_of(IdentifierType::NormalizedName).count(), 1);
    }

    #[test]
    fn test_individual_name_and_alias() {
        let record = row(&[
            (columns::REGISTRY_ID, "1111111111"),
            (columns::ENTITY_TYPE, "1"),
            (columns::LAST_NAME, "Public"),
            (columns::FIRST_NAME, "John"),
            (columns::MIDDLE_NAME, "Q"),
            (columns::NAME_PREFIX, "Dr."),
            (columns::OTHER_LAST_NAME, "Private"),
            (columns::OTHER_FIRST_NAME, "John"),
        ]);

        assert_eq!(record.display_name(), "Dr. John Q Public");
        assert_eq!(record.alias().as_deref(), Some("John Private"));

        let org = record.to_candidate(AddressPolicy::SkipRecord).unwrap();
        assert!(org.is_individual());
        assert!(org.has_identifier(IdentifierType::NormalizedName, "DR JOHN Q PUBLIC"));
        assert!(org.has_identifier(IdentifierType::NormalizedName, "JOHN PRIVATE"));
        // No address columns at all
        assert!(org.locations.is_empty());
    }

    #[test]
    fn test_deactivated_record_filtered_first() {
        let mut fields = acme_fields();
        fields.push((columns::DEACTIVATION_REASON, "DT"));
        fields.retain(|(c, _)| *c != columns::ENTITY_TYPE);

        assert_eq!(row(&fields).filter_reason(), Some(FilterReason::Deactivated));
    }

    #[test]
    fn test_filter_reasons() {
        assert_eq!(row(&acme_fields()).filter_reason(), None);
        assert_eq!(
            row(&[(columns::ORGANIZATION_NAME, "Acme")]).filter_reason(),
            Some(FilterReason::MissingEntityType)
        );
        assert_eq!(
            row(&[(columns::ENTITY_TYPE, "2")]).filter_reason(),
            Some(FilterReason::MissingName)
        );
        // Last name alone is enough
        assert_eq!(
            row(&[(columns::ENTITY_TYPE, "1"), (columns::LAST_NAME, "Public")]).filter_reason(),
            None
        );
    }

    #[test]
    fn test_short_row_reads_empty() {
        let record = ProviderRecord::new(
            StringRecord::from(vec!["1234567890", "2"]),
            RecordPosition::new(Pass::Primary, "short.csv", 5),
        );

        assert_eq!(record.field(columns::SUBPART), "");
        assert!(!record.is_subpart());
        assert_eq!(record.filter_reason(), Some(FilterReason::MissingName));
    }

    #[test]
    fn test_taxonomy_codes_and_groups() {
        let record = row(&[
            (columns::TAXONOMY_CODES[0], "207Q00000X"),
            (columns::TAXONOMY_CODES[14], "363L00000X"),
            (314, "193200000X"),
            (328, " "),
        ]);

        assert_eq!(
            record.taxonomy_codes(),
            vec!["207Q00000X", "363L00000X", "193200000X"]
        );
    }

    #[test]
    fn test_address_policy() {
        let mut fields = acme_fields();
        fields.retain(|(c, _)| *c != columns::COUNTRY);
        fields.push((columns::COUNTRY, "ZZ"));
        let record = row(&fields);

        let err = record.to_candidate(AddressPolicy::SkipRecord).unwrap_err();
        assert_eq!(err, NormalizationError::UnsupportedCountry("ZZ".to_string()));

        let org = record.to_candidate(AddressPolicy::DropLocation).unwrap();
        assert!(org.locations.is_empty());
        assert_eq!(org.id, "1234567890");
    }

    #[test]
    fn test_punctuation_only_name_is_rejected() {
        let mut fields = acme_fields();
        fields.retain(|(c, _)| *c != columns::ORGANIZATION_NAME);
        fields.push((columns::ORGANIZATION_NAME, "***"));

        // The address policy only governs locations
        let err = row(&fields).to_candidate(AddressPolicy::DropLocation).unwrap_err();
        assert_eq!(err, NormalizationError::EmptyName("***".to_string()));

        fields.retain(|(c, _)| *c != columns::ORGANIZATION_NAME);
        assert!(matches!(
            row(&fields).to_candidate(AddressPolicy::SkipRecord),
            Err(NormalizationError::EmptyName(_))
        ));
    }

    #[test]
    fn test_parent_identifiers() {
        let record = row(&[
            (columns::SUBPART, "Y"),
            (columns::PARENT_ORGANIZATION_NAME, "Acme Health System"),
            (columns::PARENT_TAX_ID, "99-7654321"),
        ]);

        let parents = record.parent_identifiers();
        assert_eq!(parents.len(), 2);
        assert_eq!(parents[0].key(), (IdentifierType::TaxId, "99-7654321"));
        assert_eq!(parents[1].key(), (IdentifierType::NormalizedName, "ACME HEALTH SYSTEM"));

        assert!(row(&[]).parent_identifiers().is_empty());
    }

    #[test]
    fn test_position_display() {
        let position = RecordPosition::new(Pass::Subpart, "data/org_subparts.csv", 12);
        assert_eq!(position.to_string(), "data/org_subparts.csv:12 (pass 2)");
    }
}
