// 🗄️ Identity Repository - where organization aggregates live
//
// The pipeline only ever talks to this trait. Two implementations:
// - SqliteRepository: the real store (WAL, unique identifiers, audit events)
// - InMemoryRepository: dry runs and tests
//
// Contract shared by both:
// - an (identifier_type, value) pair belongs to at most one organization
// - create is all-or-nothing; a conflicting create writes nothing
// - update replaces values and only ever appends children

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use crate::entities::{Organization, OrganizationIdentifier};
use crate::error::RepositoryError;

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

pub trait OrganizationRepository {
    /// Persist a new aggregate. `RepositoryError::Conflict` when its id or any
    /// of its identifiers is already taken.
    fn create(&mut self, org: &Organization) -> RepositoryResult<()>;

    /// Replace mutable fields and append any new identifiers, locations and endpoints.
    fn update(&mut self, org: &Organization) -> RepositoryResult<()>;

    /// Id of the organization owning this (type, value) pair
    fn owner_of(&self, identifier: &OrganizationIdentifier) -> RepositoryResult<Option<String>>;

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Organization>>;

    fn count(&self) -> RepositoryResult<usize>;

    /// First organization owning any of `identifiers`, tried in the given order.
    fn find_by_identifiers(&self, identifiers: &[OrganizationIdentifier]) -> RepositoryResult<Option<Organization>> {
        for identifier in identifiers {
            if let Some(owner) = self.owner_of(identifier)? {
                return self.find_by_id(&owner);
            }
        }
        Ok(None)
    }

    /// Every distinct owner of `identifiers`, in order of first appearance.
    fn find_owner_ids(&self, identifiers: &[OrganizationIdentifier]) -> RepositoryResult<Vec<String>> {
        let mut owners: Vec<String> = Vec::new();
        for identifier in identifiers {
            if let Some(owner) = self.owner_of(identifier)? {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
        }
        Ok(owners)
    }
}
