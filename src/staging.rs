// 📦 Subpart Staging - holds subpart rows between pass 1 and pass 2
//
// File mode writes each row, in original column order and without a header,
// to a CSV that is truncated when staging opens and flushed after every
// record. Memory mode keeps the rows (and their original positions) in a Vec.

use crate::error::{PipelineError, PipelineResult};
use crate::record::{Pass, ProviderRecord, RecordPosition};
use std::fs::File;
use std::path::{Path, PathBuf};

pub type StagedRecords = Box<dyn Iterator<Item = PipelineResult<ProviderRecord>>>;

pub enum StagingSet {
    File {
        path: PathBuf,
        writer: Option<csv::Writer<File>>,
        count: usize,
    },
    Memory {
        records: Vec<ProviderRecord>,
    },
}

impl StagingSet {
    /// Create (or truncate) the staging file
    pub fn file(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::StagingIo {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|source| PipelineError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(StagingSet::File {
            path: path.to_path_buf(),
            writer: Some(writer),
            count: 0,
        })
    }

    pub fn memory() -> Self {
        StagingSet::Memory { records: Vec::new() }
    }

    pub fn push(&mut self, record: &ProviderRecord) -> PipelineResult<()> {
        match self {
            StagingSet::File { writer, count, .. } => {
                let writer = writer.as_mut().ok_or_else(|| PipelineError::StagingFlush {
                    position: record.position.clone(),
                    source: std::io::Error::other("staging file already closed"),
                })?;
                writer
                    .write_record(&record.record)
                    .map_err(|source| PipelineError::StagingWrite {
                        position: record.position.clone(),
                        source,
                    })?;
                writer.flush().map_err(|source| PipelineError::StagingFlush {
                    position: record.position.clone(),
                    source,
                })?;
                *count += 1;
            }
            StagingSet::Memory { records } => records.push(record.clone()),
        }
        Ok(())
    }

    /// Flush and release the staging file. Safe to call twice.
    pub fn close(&mut self) -> PipelineResult<()> {
        if let StagingSet::File { path, writer, .. } = self {
            if let Some(mut w) = writer.take() {
                w.flush().map_err(|source| PipelineError::StagingIo {
                    path: path.display().to_string(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            StagingSet::File { count, .. } => *count,
            StagingSet::Memory { records } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay staged rows in the order they were pushed.
    ///
    /// File rows are positioned by their line in the staging file; memory rows
    /// keep the position they had in the input.
    pub fn into_records(mut self) -> PipelineResult<StagedRecords> {
        self.close()?;

        match self {
            StagingSet::File { path, .. } => {
                let source = path.display().to_string();
                let reader = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_path(&path)
                    .map_err(|err| PipelineError::Open {
                        path: source.clone(),
                        source: err,
                    })?;

                let records = reader.into_records().enumerate().map(move |(idx, result)| {
                    let fallback_line = idx as u64 + 1;
                    match result {
                        Ok(record) => {
                            let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
                            let position = RecordPosition::new(Pass::Subpart, source.clone(), line);
                            Ok(ProviderRecord::new(record, position))
                        }
                        Err(err) => Err(PipelineError::Read {
                            position: RecordPosition::new(Pass::Subpart, source.clone(), fallback_line),
                            source: err,
                        }),
                    }
                });
                Ok(Box::new(records))
            }
            StagingSet::Memory { records } => {
                let records = records.into_iter().map(|mut record| {
                    record.position.pass = Pass::Subpart;
                    Ok(record)
                });
                Ok(Box::new(records))
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
