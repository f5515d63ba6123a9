// 🧠 In-memory repository - dry runs and tests
//
// Same conflict rules as the SQLite store, backed by two maps:
// organizations by id, and owner id by (identifier_type, value).

use super::{OrganizationRepository, RepositoryResult};
use crate::entities::{IdentifierType, Organization, OrganizationIdentifier};
use crate::error::RepositoryError;
use chrono::Utc;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    organizations: HashMap<String, Organization>,
    owners: HashMap<(IdentifierType, String), String>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// First identifier of `org` owned by an organization other than `org_id`
    fn foreign_owner(&self, org_id: &str, identifiers: &[OrganizationIdentifier]) -> Option<String> {
        identifiers.iter().find_map(|identifier| {
            let key = (identifier.identifier_type, identifier.value.clone());
            match self.owners.get(&key) {
                Some(owner) if owner != org_id => Some(format!("{} owned by {}", identifier, owner)),
                _ => None,
            }
        })
    }

    fn index(&mut self, org_id: &str, identifiers: &[OrganizationIdentifier]) {
        for identifier in identifiers {
            self.owners
                .entry((identifier.identifier_type, identifier.value.clone()))
                .or_insert_with(|| org_id.to_string());
        }
    }
}

impl OrganizationRepository for InMemoryRepository {
    fn create(&mut self, org: &Organization) -> RepositoryResult<()> {
        if self.organizations.contains_key(&org.id) {
            return Err(RepositoryError::Conflict(format!("organization id {}", org.id)));
        }
        for identifier in &org.identifiers {
            let key = (identifier.identifier_type, identifier.value.clone());
            if let Some(owner) = self.owners.get(&key) {
                return Err(RepositoryError::Conflict(format!("{} owned by {}", identifier, owner)));
            }
        }

        self.index(&org.id, &org.identifiers);
        self.organizations.insert(org.id.clone(), org.clone());
        Ok(())
    }

    fn update(&mut self, org: &Organization) -> RepositoryResult<()> {
        if !self.organizations.contains_key(&org.id) {
            return Err(RepositoryError::Missing(org.id.clone()));
        }
        if let Some(conflict) = self.foreign_owner(&org.id, &org.identifiers) {
            return Err(RepositoryError::Conflict(conflict));
        }

        self.index(&org.id, &org.identifiers);

        let stored = self
            .organizations
            .get_mut(&org.id)
            .ok_or_else(|| RepositoryError::Missing(org.id.clone()))?;

        stored.organization_type = org.organization_type;
        stored.name = org.name.clone();
        stored.taxonomy = org.taxonomy.clone();
        stored.is_sole_proprietor = org.is_sole_proprietor;
        stored.related_urls = org.related_urls.clone();

        for identifier in &org.identifiers {
            stored.add_identifier(identifier.clone());
        }
        for location in &org.locations {
            if !stored.locations.contains(location) {
                stored.locations.push(location.clone());
            }
        }
        for endpoint in &org.endpoints {
            if !stored.endpoints.contains(endpoint) {
                stored.endpoints.push(endpoint.clone());
            }
        }
        stored.updated_at = Utc::now();

        Ok(())
    }

    fn owner_of(&self, identifier: &OrganizationIdentifier) -> RepositoryResult<Option<String>> {
        Ok(self
            .owners
            .get(&(identifier.identifier_type, identifier.value.clone()))
            .cloned())
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Organization>> {
        Ok(self.organizations.get(id).cloned())
    }

    fn count(&self) -> RepositoryResult<usize> {
        Ok(self.organizations.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================
