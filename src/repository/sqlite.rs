// 💾 SQLite repository - the persistent identity store
//
// Uniqueness lives in the schema: UNIQUE(identifier_type, value) is what
// turns "already seen" into a constraint violation, which we surface as
// RepositoryError::Conflict. Every successful write also appends an audit
// event.

use super::{OrganizationRepository, RepositoryResult};
use crate::entities::{
    Endpoint, IdentifierType, Location, Organization, OrganizationIdentifier, OrganizationType,
};
use crate::error::RepositoryError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const EVENT_ACTOR: &str = "provider_reconcile";

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Append-only audit record, one per successful write
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(event_type: &str, entity_id: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: "organization".to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: EVENT_ACTOR.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> RepositoryResult<()> {
    // WAL for crash recovery; the busy timeout covers readers like `stats`
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 30000)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            organization_type TEXT,
            name TEXT NOT NULL,
            taxonomy TEXT NOT NULL,
            is_sole_proprietor INTEGER NOT NULL DEFAULT 0,
            related_urls TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organization_identifiers (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(id),
            identifier_type TEXT NOT NULL,
            value TEXT NOT NULL,
            display TEXT,
            UNIQUE(identifier_type, value)
        );

        -- Shared between organizations at the same canonical address
        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            lines TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            postal_code TEXT NOT NULL,
            country TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organization_locations (
            organization_id TEXT NOT NULL REFERENCES organizations(id),
            location_id TEXT NOT NULL REFERENCES locations(id),
            PRIMARY KEY (organization_id, location_id)
        );

        CREATE TABLE IF NOT EXISTS endpoints (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(id),
            url TEXT NOT NULL,
            canonical_url TEXT NOT NULL,
            source_url TEXT NOT NULL,
            platform_type TEXT NOT NULL,
            UNIQUE(organization_id, canonical_url, source_url, platform_type)
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_identifiers_org ON organization_identifiers(organization_id);
        CREATE INDEX IF NOT EXISTS idx_endpoints_org ON endpoints(organization_id);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

/// Constraint violations become conflicts; everything else stays a database error.
fn conflict_or(err: rusqlite::Error, what: impl FnOnce() -> String) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            RepositoryError::Conflict(what())
        }
        other => RepositoryError::Database(other),
    }
}

fn parse_timestamp(raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    /// Audit events for one organization, oldest first
    pub fn events_for_organization(&self, organization_id: &str) -> RepositoryResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = 'organization' AND entity_id = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map(params![organization_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| {
                Ok(Event {
                    event_id,
                    timestamp: parse_timestamp(&timestamp)?,
                    event_type,
                    entity_type,
                    entity_id,
                    data: serde_json::from_str(&data)?,
                    actor,
                })
            })
            .collect()
    }

    /// (event_type, count) pairs, alphabetical
    pub fn event_counts(&self) -> RepositoryResult<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT event_type, COUNT(*) FROM events GROUP BY event_type ORDER BY event_type")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// (identifier_type, count) pairs, alphabetical
    pub fn identifier_counts(&self) -> RepositoryResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT identifier_type, COUNT(*) FROM organization_identifiers
             GROUP BY identifier_type ORDER BY identifier_type",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn load_identifiers(&self, organization_id: &str) -> RepositoryResult<Vec<OrganizationIdentifier>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identifier_type, value, display FROM organization_identifiers
             WHERE organization_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![organization_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, identifier_type, value, display)| {
                let identifier_type = identifier_type
                    .parse::<IdentifierType>()
                    .map_err(RepositoryError::Corrupt)?;
                Ok(OrganizationIdentifier {
                    id,
                    identifier_type,
                    value,
                    display,
                })
            })
            .collect()
    }

    fn load_locations(&self, organization_id: &str) -> RepositoryResult<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.lines, l.city, l.state, l.postal_code, l.country
             FROM organization_locations ol
             JOIN locations l ON l.id = ol.location_id
             WHERE ol.organization_id = ?1
             ORDER BY ol.rowid",
        )?;
        let rows = stmt
            .query_map(params![organization_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, lines, city, state, postal_code, country)| {
                Ok(Location {
                    id,
                    lines: serde_json::from_str(&lines)?,
                    city,
                    state,
                    postal_code,
                    country,
                })
            })
            .collect()
    }

    fn load_endpoints(&self, organization_id: &str) -> RepositoryResult<Vec<Endpoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, source_url, platform_type FROM endpoints
             WHERE organization_id = ?1 ORDER BY rowid",
        )?;
        let endpoints = stmt
            .query_map(params![organization_id], |row| {
                Ok(Endpoint {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    source_url: row.get(2)?,
                    platform_type: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(endpoints)
    }
}

// ============================================================================
// WRITE HELPERS (run inside a transaction)
// ============================================================================

fn insert_event(tx: &Transaction<'_>, event: &Event) -> RepositoryResult<()> {
    let data_json = serde_json::to_string(&event.data)?;

    tx.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

fn insert_identifier(tx: &Transaction<'_>, organization_id: &str, identifier: &OrganizationIdentifier) -> RepositoryResult<()> {
    tx.execute(
        "INSERT INTO organization_identifiers (id, organization_id, identifier_type, value, display)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            identifier.id,
            organization_id,
            identifier.identifier_type.as_str(),
            identifier.value,
            identifier.display,
        ],
    )
    .map_err(|e| conflict_or(e, || identifier.to_string()))?;
    Ok(())
}

/// Returns true when the organization gained the location
fn link_location(tx: &Transaction<'_>, organization_id: &str, location: &Location) -> RepositoryResult<bool> {
    tx.execute(
        "INSERT OR IGNORE INTO locations (id, lines, city, state, postal_code, country)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            location.id,
            serde_json::to_string(&location.lines)?,
            location.city,
            location.state,
            location.postal_code,
            location.country,
        ],
    )?;
    let linked = tx.execute(
        "INSERT OR IGNORE INTO organization_locations (organization_id, location_id) VALUES (?1, ?2)",
        params![organization_id, location.id],
    )?;
    Ok(linked > 0)
}

/// Returns true when the endpoint was new for this organization
fn insert_endpoint(tx: &Transaction<'_>, organization_id: &str, endpoint: &Endpoint) -> RepositoryResult<bool> {
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO endpoints (id, organization_id, url, canonical_url, source_url, platform_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            endpoint.id,
            organization_id,
            endpoint.url,
            endpoint.canonical_url(),
            endpoint.source_url,
            endpoint.platform_type,
        ],
    )?;
    Ok(inserted > 0)
}

fn set_json(values: &BTreeSet<String>) -> RepositoryResult<String> {
    Ok(serde_json::to_string(values)?)
}

impl OrganizationRepository for SqliteRepository {
    fn create(&mut self, org: &Organization) -> RepositoryResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO organizations (
                id, organization_type, name, taxonomy, is_sole_proprietor, related_urls,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                org.id,
                org.organization_type.map(|t| t.as_str()),
                org.name,
                set_json(&org.taxonomy)?,
                org.is_sole_proprietor,
                set_json(&org.related_urls)?,
                org.created_at.to_rfc3339(),
                org.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict_or(e, || format!("organization id {}", org.id)))?;

        // Any failure below drops `tx`, rolling the whole aggregate back
        for identifier in &org.identifiers {
            insert_identifier(&tx, &org.id, identifier)?;
        }
        for location in &org.locations {
            link_location(&tx, &org.id, location)?;
        }
        for endpoint in &org.endpoints {
            insert_endpoint(&tx, &org.id, endpoint)?;
        }

        insert_event(
            &tx,
            &Event::new(
                "organization_created",
                &org.id,
                serde_json::json!({
                    "name": org.name,
                    "identifiers": org.identifiers.len(),
                    "locations": org.locations.len(),
                }),
            ),
        )?;

        tx.commit()?;
        debug!(organization = %org.id, "organization created");
        Ok(())
    }

    fn update(&mut self, org: &Organization) -> RepositoryResult<()> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE organizations
             SET organization_type = ?2, name = ?3, taxonomy = ?4, is_sole_proprietor = ?5,
                 related_urls = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                org.id,
                org.organization_type.map(|t| t.as_str()),
                org.name,
                set_json(&org.taxonomy)?,
                org.is_sole_proprietor,
                set_json(&org.related_urls)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::Missing(org.id.clone()));
        }

        let mut added_identifiers = 0;
        for identifier in &org.identifiers {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT organization_id FROM organization_identifiers
                     WHERE identifier_type = ?1 AND value = ?2",
                    params![identifier.identifier_type.as_str(), identifier.value],
                    |row| row.get(0),
                )
                .optional()?;

            match owner {
                Some(owner) if owner == org.id => {}
                Some(owner) => {
                    return Err(RepositoryError::Conflict(format!("{} owned by {}", identifier, owner)));
                }
                None => {
                    insert_identifier(&tx, &org.id, identifier)?;
                    added_identifiers += 1;
                }
            }
        }

        let mut added_locations = 0;
        for location in &org.locations {
            if link_location(&tx, &org.id, location)? {
                added_locations += 1;
            }
        }

        let mut added_endpoints = 0;
        for endpoint in &org.endpoints {
            if insert_endpoint(&tx, &org.id, endpoint)? {
                added_endpoints += 1;
            }
        }

        insert_event(
            &tx,
            &Event::new(
                "organization_merged",
                &org.id,
                serde_json::json!({
                    "added_identifiers": added_identifiers,
                    "added_locations": added_locations,
                    "added_endpoints": added_endpoints,
                }),
            ),
        )?;

        tx.commit()?;
        debug!(organization = %org.id, added_identifiers, added_locations, added_endpoints, "organization updated");
        Ok(())
    }

    fn owner_of(&self, identifier: &OrganizationIdentifier) -> RepositoryResult<Option<String>> {
        let owner = self
            .conn
            .query_row(
                "SELECT organization_id FROM organization_identifiers
                 WHERE identifier_type = ?1 AND value = ?2",
                params![identifier.identifier_type.as_str(), identifier.value],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Organization>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, organization_type, name, taxonomy, is_sole_proprietor, related_urls,
                        created_at, updated_at
                 FROM organizations WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, organization_type, name, taxonomy, is_sole_proprietor, related_urls, created_at, updated_at)) = row
        else {
            return Ok(None);
        };

        let organization_type = match organization_type {
            Some(raw) => Some(
                OrganizationType::parse(&raw)
                    .ok_or_else(|| RepositoryError::Corrupt(format!("organization type '{}'", raw)))?,
            ),
            None => None,
        };

        Ok(Some(Organization {
            identifiers: self.load_identifiers(&id)?,
            locations: self.load_locations(&id)?,
            endpoints: self.load_endpoints(&id)?,
            id,
            organization_type,
            name,
            taxonomy: serde_json::from_str(&taxonomy)?,
            is_sole_proprietor,
            related_urls: serde_json::from_str(&related_urls)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }

    fn count(&self) -> RepositoryResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM organizations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Organization {
        Organization::new(Some("1234567890"), Some(OrganizationType::Organization), "Acme Clinic")
            .with_identifier(OrganizationIdentifier::primary_registry_id("1234567890"))
            .with_identifier(OrganizationIdentifier::registry_id("1234567890"))
            .with_identifier(OrganizationIdentifier::tax_id("99-1234567"))
            .with_taxonomy(vec!["261QP2300X"])
            .with_location(
                Location::new(vec!["1 Main St".to_string()], "Springfield", "IL", "62701", "US").unwrap(),
            )
            .with_endpoint(Endpoint::new("fhir.acme.example.com", "lighthouse", "epic"))
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
    }

    #[test]
    fn test_create_and_reload_aggregate() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let org = acme();
        repo.create(&org).unwrap();

        let loaded = repo.find_by_id("1234567890").unwrap().unwrap();
        assert_eq!(loaded.name, "Acme Clinic");
        assert_eq!(loaded.organization_type, Some(OrganizationType::Organization));
        assert_eq!(loaded.taxonomy, org.taxonomy);
        assert_eq!(loaded.locations, org.locations);
        assert_eq!(loaded.endpoints, org.endpoints);

        let loaded_ids: Vec<(IdentifierType, &str)> = loaded.identifiers.iter().map(|i| i.key()).collect();
        let expected_ids: Vec<(IdentifierType, &str)> = org.identifiers.iter().map(|i| i.key()).collect();
        assert_eq!(loaded_ids, expected_ids);
        assert_eq!(loaded.identifiers[0].display.as_deref(), Some("Acme Clinic"));
    }

    #[test]
    fn test_create_conflict_is_atomic() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();

        // New id and name, but reuses the tax id as its last identifier
        let other = Organization::new(Some("5550001111"), None, "Other Clinic")
            .with_identifier(OrganizationIdentifier::registry_id("5550001111"))
            .with_identifier(OrganizationIdentifier::tax_id("99-1234567"));

        let err = repo.create(&other).unwrap_err();
        assert!(err.is_conflict(), "expected conflict, got {:?}", err);

        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.find_by_id("5550001111").unwrap().is_none());
        assert!(repo
            .owner_of(&OrganizationIdentifier::registry_id("5550001111"))
            .unwrap()
            .is_none());
        assert!(repo
            .owner_of(&OrganizationIdentifier::normalized_name("Other Clinic"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_conflict_on_existing_id() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();

        let err = repo
            .create(&Organization::new(Some("1234567890"), None, "Renamed"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_find_by_identifiers() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();

        let found = repo
            .find_by_identifiers(&[
                OrganizationIdentifier::registry_id("0000000000"),
                OrganizationIdentifier::normalized_name("acme clinic"),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "1234567890");

        let missing = repo
            .find_by_identifiers(&[OrganizationIdentifier::tax_id("00-0000000")])
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_update_appends_children() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();

        let mut org = repo.find_by_id("1234567890").unwrap().unwrap();
        org.add_identifier(OrganizationIdentifier::normalized_name("Acme Clinic LLC"));
        org.locations.push(
            Location::new(vec!["9 Elm St".to_string()], "Springfield", "IL", "62702", "US").unwrap(),
        );
        org.endpoints.push(Endpoint::new("FHIR.acme.example.com", "lighthouse", "epic"));
        org.taxonomy.insert("207Q00000X".to_string());
        repo.update(&org).unwrap();

        let stored = repo.find_by_id("1234567890").unwrap().unwrap();
        assert_eq!(stored.identifiers.len(), 5);
        assert_eq!(stored.locations.len(), 2);
        // Same canonical URL, not a new endpoint
        assert_eq!(stored.endpoints.len(), 1);
        assert_eq!(stored.taxonomy.len(), 2);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[test]
    fn test_update_conflict_rolls_back() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();
        repo.create(&Organization::new(Some("777"), None, "Beta Health")).unwrap();

        let mut org = repo.find_by_id("1234567890").unwrap().unwrap();
        org.taxonomy.insert("207Q00000X".to_string());
        org.add_identifier(OrganizationIdentifier::normalized_name("Beta Health"));

        assert!(repo.update(&org).unwrap_err().is_conflict());

        let stored = repo.find_by_id("1234567890").unwrap().unwrap();
        assert_eq!(stored.taxonomy.len(), 1);
    }

    #[test]
    fn test_update_missing_organization() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let err = repo.update(&acme()).unwrap_err();
        assert!(matches!(err, RepositoryError::Missing(_)));
    }

    #[test]
    fn test_shared_location_between_organizations() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let place = Location::new(vec!["1 Main St".to_string()], "Springfield", "IL", "62701", "US").unwrap();
        repo.create(&Organization::new(Some("1"), None, "Alpha").with_location(place.clone()))
            .unwrap();
        repo.create(&Organization::new(Some("2"), None, "Beta").with_location(place.clone()))
            .unwrap();

        let beta = repo.find_by_id("2").unwrap().unwrap();
        assert_eq!(beta.locations, vec![place]);
    }

    #[test]
    fn test_events_recorded_per_write() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();
        let org = repo.find_by_id("1234567890").unwrap().unwrap();
        repo.update(&org).unwrap();

        let events = repo.events_for_organization("1234567890").unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["organization_created", "organization_merged"]);
        assert_eq!(events[0].data["identifiers"], 4);
        assert_eq!(events[1].data["added_identifiers"], 0);

        assert_eq!(
            repo.event_counts().unwrap(),
            vec![
                ("organization_created".to_string(), 1),
                ("organization_merged".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_identifier_counts() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.create(&acme()).unwrap();

        let counts = repo.identifier_counts().unwrap();
        assert_eq!(counts.len(), 4);
        assert!(counts.iter().all(|(_, n)| *n == 1));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");

        {
            let mut repo = SqliteRepository::open(&path).unwrap();
            repo.create(&acme()).unwrap();
        }

        let repo = SqliteRepository::open(&path).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }
}
