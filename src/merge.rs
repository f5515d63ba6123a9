// 🔀 Merge Engine - fold an incoming record into an existing organization
//
// `existing` is authoritative (it came from the repository); `incoming` was
// just built from a registry row. Seven rules run in order and each one
// reports what it added:
//
//   1. name      → alias NormalizedName identifier (existing.name untouched)
//   2. type      → adopted only when existing has none
//   3. taxonomy  → set union
//   4. urls      → set union
//   5. locations → append canonically new ones
//   6. endpoints → append new ones
//   7. identifiers → append unseen (type, value) pairs
//
// Merging only ever adds. Merging an organization with a copy of itself
// reports no changes.

use crate::entities::{IdentifierType, Organization, OrganizationIdentifier, OrganizationType};
use std::collections::BTreeSet;
use tracing::debug;

// ============================================================================
// MERGE CHANGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeChange {
    /// A differently-normalized name was recorded as an alias
    NameAlias { value: String, display: String },

    /// Organization type was unset and got adopted
    OrganizationType { adopted: OrganizationType },

    Taxonomy { added: Vec<String> },

    RelatedUrls { added: Vec<String> },

    Location { id: String },

    Endpoint { url: String },

    Identifier {
        identifier_type: IdentifierType,
        value: String,
    },
}

// ============================================================================
// MERGE OUTCOME
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub changes: Vec<MergeChange>,
}

impl MergeOutcome {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.changes.is_empty() {
            return "no changes".to_string();
        }
        let kinds: Vec<&str> = self
            .changes
            .iter()
            .map(|c| match c {
                MergeChange::NameAlias { .. } => "name_alias",
                MergeChange::OrganizationType { .. } => "organization_type",
                MergeChange::Taxonomy { .. } => "taxonomy",
                MergeChange::RelatedUrls { .. } => "related_urls",
                MergeChange::Location { .. } => "location",
                MergeChange::Endpoint { .. } => "endpoint",
                MergeChange::Identifier { .. } => "identifier",
            })
            .collect();
        format!("{} change(s): {}", self.changes.len(), kinds.join(", "))
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// Fold `incoming` into `existing`, returning every change that was applied.
pub fn merge(existing: &mut Organization, incoming: &Organization) -> MergeOutcome {
    let mut changes = Vec::new();

    changes.extend(merge_name(existing, incoming));
    changes.extend(merge_type(existing, incoming));
    changes.extend(
        merge_set(&mut existing.taxonomy, &incoming.taxonomy)
            .map(|added| MergeChange::Taxonomy { added }),
    );
    changes.extend(
        merge_set(&mut existing.related_urls, &incoming.related_urls)
            .map(|added| MergeChange::RelatedUrls { added }),
    );
    changes.extend(merge_locations(existing, incoming));
    changes.extend(merge_endpoints(existing, incoming));
    changes.extend(merge_identifiers(existing, incoming));

    for change in &changes {
        debug!(organization = %existing.id, ?change, "merge change");
    }

    MergeOutcome { changes }
}

impl Organization {
    /// Merge `incoming` into self; true when anything changed.
    pub fn merge_has_changes(&mut self, incoming: &Organization) -> bool {
        merge(self, incoming).has_changes()
    }
}

/// Rule 1: a different normalized name becomes an alias identifier
fn merge_name(existing: &mut Organization, incoming: &Organization) -> Option<MergeChange> {
    let incoming_key = incoming.normalized_name();
    if existing.normalized_name() == incoming_key {
        return None;
    }

    // Already recorded by an earlier merge
    if existing.has_identifier(IdentifierType::NormalizedName, &incoming_key) {
        return None;
    }

    existing.identifiers.push(OrganizationIdentifier::new(
        IdentifierType::NormalizedName,
        incoming_key.clone(),
        Some(incoming.name.clone()),
    ));

    Some(MergeChange::NameAlias {
        value: incoming_key,
        display: incoming.name.clone(),
    })
}

/// Rule 2: adopt the incoming type only when ours is unset
fn merge_type(existing: &mut Organization, incoming: &Organization) -> Option<MergeChange> {
    match (existing.organization_type, incoming.organization_type) {
        (None, Some(adopted)) => {
            existing.organization_type = Some(adopted);
            Some(MergeChange::OrganizationType { adopted })
        }
        _ => None,
    }
}

/// Rules 3 & 4: set union. Returns the values that were new.
fn merge_set(existing: &mut BTreeSet<String>, incoming: &BTreeSet<String>) -> Option<Vec<String>> {
    let added: Vec<String> = incoming.difference(existing).cloned().collect();
    if added.is_empty() {
        return None;
    }
    existing.extend(added.iter().cloned());
    Some(added)
}

/// Rule 5: append locations whose canonical id we don't have yet
fn merge_locations(existing: &mut Organization, incoming: &Organization) -> Vec<MergeChange> {
    let mut changes = Vec::new();
    for location in &incoming.locations {
        if existing.locations.contains(location) {
            continue;
        }
        changes.push(MergeChange::Location {
            id: location.id.clone(),
        });
        existing.locations.push(location.clone());
    }
    changes
}

/// Rule 6: append endpoints not equal (url + source + platform) to any existing one
fn merge_endpoints(existing: &mut Organization, incoming: &Organization) -> Vec<MergeChange> {
    let mut changes = Vec::new();
    for endpoint in &incoming.endpoints {
        if existing.endpoints.contains(endpoint) {
            continue;
        }
        changes.push(MergeChange::Endpoint {
            url: endpoint.canonical_url(),
        });
        existing.endpoints.push(endpoint.clone());
    }
    changes
}

/// Rule 7: append identifiers whose (type, value) slot is free on `existing`
fn merge_identifiers(existing: &mut Organization, incoming: &Organization) -> Vec<MergeChange> {
    let mut changes = Vec::new();
    for identifier in &incoming.identifiers {
        if existing.add_identifier(identifier.clone()) {
            changes.push(MergeChange::Identifier {
                identifier_type: identifier.identifier_type,
                value: identifier.value.clone(),
            });
        }
    }
    changes
}

// ============================================================================
// TESTS
// ============================================================================
