// Entity Models - the provider registry aggregate
//
// Identity is computed up front by explicit constructors:
// - Organization: registry number, or a key derived from its normalized name
// - OrganizationIdentifier: (type, value), the global matching key
// - Location: canonical address string
// - Endpoint: canonical URL + source + platform

pub mod endpoint;
pub mod identifier;
pub mod location;
pub mod organization;

pub use endpoint::Endpoint;
pub use identifier::{describe_identifiers, in_match_order, IdentifierType, OrganizationIdentifier};
pub use location::Location;
pub use organization::{name_key, Organization, OrganizationType};
