// 🔁 Ingestion Pipeline - two passes over the registry export
//
// Pass 1 (every row):
//   filter → subpart? stage it : build candidate → create
//   create conflicted → find existing → individual? skip : merge → update if changed
//
// Pass 2 (staged subparts, after pass 1 finished):
//   build candidate → find parent (own ids, then parent tax id / name)
//   no parent → ConsistencyError, the run stops
//   otherwise the same skip/merge as pass 1
//
// Bad data in a record (address, missing match, update conflict) skips the
// record. Storage and I/O failures stop the run.

use crate::config::{AddressPolicy, Config, MatchPolicy, StagingMode};
use crate::entities::{describe_identifiers, Organization, OrganizationIdentifier};
use crate::error::{PipelineError, PipelineResult, RecordError, RepositoryError};
use crate::merge::merge;
use crate::record::{FilterReason, Pass, ProviderRecord, RecordPosition};
use crate::repository::OrganizationRepository;
use crate::staging::{StagedRecords, StagingSet};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Terminal state of one record
#[derive(Debug)]
pub enum RecordOutcome {
    Filtered(FilterReason),
    Staged,
    Created,
    /// The matching organization is an individual; never merged into
    SkippedIndividualConflict,
    MergeApplied { organization_id: String, changes: usize },
    MergeNoop { organization_id: String },
    Skipped(RecordError),
}

/// Result of looking up the organization a candidate collides with
enum Lookup {
    Found(Organization),
    Missing,
    Ambiguous(Vec<String>),
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    #[serde(skip)]
    pub pass: Pass,
    pub records: u64,
    pub filtered: u64,
    pub staged: u64,
    pub created: u64,
    pub merged: u64,
    pub unchanged: u64,
    pub individual_conflicts: u64,
    pub skipped: u64,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        PassReport {
            pass,
            records: 0,
            filtered: 0,
            staged: 0,
            created: 0,
            merged: 0,
            unchanged: 0,
            individual_conflicts: 0,
            skipped: 0,
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.records += 1;
        match outcome {
            RecordOutcome::Filtered(_) => self.filtered += 1,
            RecordOutcome::Staged => self.staged += 1,
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::SkippedIndividualConflict => self.individual_conflicts += 1,
            RecordOutcome::MergeApplied { .. } => self.merged += 1,
            RecordOutcome::MergeNoop { .. } => self.unchanged += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} records ({} filtered, {} staged, {} created, {} merged, {} unchanged, {} individual conflicts, {} skipped)",
            self.pass,
            self.records,
            self.filtered,
            self.staged,
            self.created,
            self.merged,
            self.unchanged,
            self.individual_conflicts,
            self.skipped
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub primary: PassReport,
    pub subpart: PassReport,
}

impl PipelineReport {
    pub fn summary(&self) -> String {
        format!("{}\n{}", self.primary.summary(), self.subpart.summary())
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<R: OrganizationRepository> {
    repository: R,
    address_policy: AddressPolicy,
    match_policy: MatchPolicy,
    staging_mode: StagingMode,
    staging_path: std::path::PathBuf,
    has_headers: bool,
    progress_interval: u64,
}

impl<R: OrganizationRepository> Pipeline<R> {
    pub fn new(repository: R, config: &Config) -> Self {
        Pipeline {
            repository,
            address_policy: config.address_policy,
            match_policy: config.match_policy,
            staging_mode: config.staging,
            staging_path: config.staging_path.clone(),
            has_headers: config.has_headers,
            progress_interval: config.progress_interval,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Staging set as configured (the file is truncated here)
    pub fn open_staging(&self) -> PipelineResult<StagingSet> {
        match self.staging_mode {
            StagingMode::File => StagingSet::file(&self.staging_path),
            StagingMode::Memory => Ok(StagingSet::memory()),
        }
    }

    /// Run both passes over a registry export on disk
    pub fn run_path(&mut self, path: &Path) -> PipelineResult<PipelineReport> {
        let file = std::fs::File::open(path).map_err(|source| PipelineError::Open {
            path: path.display().to_string(),
            source: source.into(),
        })?;
        let staging = self.open_staging()?;
        self.run_reader(file, &path.display().to_string(), staging)
    }

    /// Run both passes over any reader. `source` names it in diagnostics.
    pub fn run_reader<Rd: Read>(
        &mut self,
        input: Rd,
        source: &str,
        mut staging: StagingSet,
    ) -> PipelineResult<PipelineReport> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .from_reader(input);

        let primary = self.primary_pass(reader, source, &mut staging)?;
        let staged = staging.into_records()?;
        let subpart = self.subpart_pass(staged)?;

        Ok(PipelineReport { primary, subpart })
    }

    // ========================================================================
    // PASS 1
    // ========================================================================

    pub fn primary_pass<Rd: Read>(
        &mut self,
        reader: csv::Reader<Rd>,
        source: &str,
        staging: &mut StagingSet,
    ) -> PipelineResult<PassReport> {
        let mut report = PassReport::new(Pass::Primary);
        info!(source, "starting pass 1");

        for (idx, result) in reader.into_records().enumerate() {
            let fallback_line = idx as u64 + 1 + u64::from(self.has_headers);
            let record = result.map_err(|err| {
                let line = err.position().map(|p| p.line()).unwrap_or(fallback_line);
                PipelineError::Read {
                    position: RecordPosition::new(Pass::Primary, source, line),
                    source: err,
                }
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
            let record = ProviderRecord::new(record, RecordPosition::new(Pass::Primary, source, line));

            let outcome = self.process_primary(&record, staging)?;
            log_outcome(&record, &outcome);
            report.record(&outcome);
            self.log_progress(&report);
        }

        staging.close()?;
        info!(staged = staging.len(), "{}", report.summary());
        Ok(report)
    }

    pub fn process_primary(
        &mut self,
        record: &ProviderRecord,
        staging: &mut StagingSet,
    ) -> PipelineResult<RecordOutcome> {
        if let Some(reason) = record.filter_reason() {
            return Ok(RecordOutcome::Filtered(reason));
        }

        if record.is_subpart() {
            staging.push(record)?;
            return Ok(RecordOutcome::Staged);
        }

        let candidate = match record.to_candidate(self.address_policy) {
            Ok(candidate) => candidate,
            Err(err) => return Ok(RecordOutcome::Skipped(err.into())),
        };

        match self.repository.create(&candidate) {
            Ok(()) => Ok(RecordOutcome::Created),
            Err(err) if err.is_conflict() => {
                let lookup = candidate.lookup_order();
                match self.resolve(&lookup, &record.position)? {
                    Lookup::Found(existing) => self.merge_found(existing, &candidate, &record.position),
                    Lookup::Missing => Ok(RecordOutcome::Skipped(RecordError::NotFound {
                        identifiers: describe_identifiers(&lookup),
                    })),
                    Lookup::Ambiguous(owners) => Ok(RecordOutcome::Skipped(RecordError::AmbiguousMatch { owners })),
                }
            }
            Err(err) => Err(storage_failure(&record.position, err)),
        }
    }

    // ========================================================================
    // PASS 2
    // ========================================================================

    pub fn subpart_pass(&mut self, records: StagedRecords) -> PipelineResult<PassReport> {
        let mut report = PassReport::new(Pass::Subpart);
        info!("starting pass 2");

        for record in records {
            let record = record?;
            let outcome = self.process_subpart(&record)?;
            log_outcome(&record, &outcome);
            report.record(&outcome);
            self.log_progress(&report);
        }

        info!("{}", report.summary());
        Ok(report)
    }

    pub fn process_subpart(&mut self, record: &ProviderRecord) -> PipelineResult<RecordOutcome> {
        let candidate = match record.to_candidate(self.address_policy) {
            Ok(candidate) => candidate,
            Err(err) => return Ok(RecordOutcome::Skipped(err.into())),
        };

        // Own identifiers first, then whatever points at the parent
        let mut lookup = candidate.lookup_order();
        for parent in record.parent_identifiers() {
            if !lookup.iter().any(|i| i.same_key(&parent)) {
                lookup.push(parent);
            }
        }

        match self.resolve(&lookup, &record.position)? {
            Lookup::Found(existing) => self.merge_found(existing, &candidate, &record.position),
            Lookup::Missing => Err(PipelineError::Consistency {
                position: record.position.clone(),
                name: candidate.name,
                identifiers: describe_identifiers(&lookup),
            }),
            Lookup::Ambiguous(owners) => Ok(RecordOutcome::Skipped(RecordError::AmbiguousMatch { owners })),
        }
    }

    // ========================================================================
    // SHARED STEPS
    // ========================================================================

    fn resolve(&self, lookup: &[OrganizationIdentifier], position: &RecordPosition) -> PipelineResult<Lookup> {
        let found = match self.match_policy {
            MatchPolicy::FirstMatch => self.repository.find_by_identifiers(lookup),
            MatchPolicy::RejectAmbiguous => {
                let owners = self
                    .repository
                    .find_owner_ids(lookup)
                    .map_err(|err| storage_failure(position, err))?;
                if owners.len() > 1 {
                    return Ok(Lookup::Ambiguous(owners));
                }
                match owners.first() {
                    Some(owner) => self.repository.find_by_id(owner),
                    None => Ok(None),
                }
            }
        }
        .map_err(|err| storage_failure(position, err))?;

        Ok(match found {
            Some(org) => Lookup::Found(org),
            None => Lookup::Missing,
        })
    }

    fn merge_found(
        &mut self,
        mut existing: Organization,
        candidate: &Organization,
        position: &RecordPosition,
    ) -> PipelineResult<RecordOutcome> {
        if existing.is_individual() {
            return Ok(RecordOutcome::SkippedIndividualConflict);
        }

        let outcome = merge(&mut existing, candidate);
        if !outcome.has_changes() {
            return Ok(RecordOutcome::MergeNoop {
                organization_id: existing.id,
            });
        }

        match self.repository.update(&existing) {
            Ok(()) => Ok(RecordOutcome::MergeApplied {
                organization_id: existing.id,
                changes: outcome.changes.len(),
            }),
            Err(err) if err.is_conflict() => Ok(RecordOutcome::Skipped(RecordError::UpdateConflict(err.to_string()))),
            Err(err) => Err(storage_failure(position, err)),
        }
    }

    fn log_progress(&self, report: &PassReport) {
        if self.progress_interval > 0 && report.records % self.progress_interval == 0 {
            info!(
                pass = %report.pass,
                records = report.records,
                created = report.created,
                merged = report.merged,
                skipped = report.skipped,
                "progress"
            );
        }
    }
}

fn storage_failure(position: &RecordPosition, source: RepositoryError) -> PipelineError {
    PipelineError::Storage {
        position: position.clone(),
        source,
    }
}

fn log_outcome(record: &ProviderRecord, outcome: &RecordOutcome) {
    let registry_id = record.registry_id();
    let line = record.position.line;
    let pass = record.position.pass;

    match outcome {
        RecordOutcome::Filtered(reason) => {
            debug!(registry_id, line, %pass, reason = reason.as_str(), "record filtered");
        }
        RecordOutcome::Staged => debug!(registry_id, line, %pass, "subpart staged"),
        RecordOutcome::Created => debug!(registry_id, line, %pass, "organization created"),
        RecordOutcome::SkippedIndividualConflict => {
            debug!(registry_id, line, %pass, "conflicts with an individual, skipped");
        }
        RecordOutcome::MergeApplied { organization_id, changes } => {
            debug!(registry_id, line, %pass, organization = %organization_id, changes, "merged");
        }
        RecordOutcome::MergeNoop { organization_id } => {
            debug!(registry_id, line, %pass, organization = %organization_id, "nothing new to merge");
        }
        RecordOutcome::Skipped(err) => {
            warn!(registry_id, line, %pass, source = %record.position.source, error = %err, "record skipped");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
