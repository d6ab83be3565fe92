//! Per-document state machine and the batch fold over it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::classify::DocumentClassifier;
use super::header::HeaderParser;
use super::resolve::{resolve_header, resolve_rows};
use super::source::DocumentSource;
use super::table::{clean_table, concat_tables, parse_layout_page};
use super::taxonomy::{DateReader, is_paired_discipline};
use super::types::{Dataset, DocumentError, PageRegion, RESULTS_REGION};
use crate::mappings::Mappings;

/// How a classified document left the pipeline, short of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    Ingested { rows: usize },
    /// Category belongs to a discipline this dataset does not track.
    Skipped,
    /// The table region held no rows at all.
    EmptyTable,
}

#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: DocumentError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub invalid_documents: Vec<PathBuf>,
    pub ingested: Vec<(PathBuf, usize)>,
    pub skipped_documents: Vec<PathBuf>,
    pub empty_table_documents: Vec<PathBuf>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchReport {
    pub fn documents_seen(&self) -> usize {
        self.documents_valid() + self.invalid_documents.len()
    }

    pub fn documents_valid(&self) -> usize {
        self.ingested.len()
            + self.skipped_documents.len()
            + self.empty_table_documents.len()
            + self.failures.len()
    }
}

pub struct Pipeline<'a, S: DocumentSource> {
    source: &'a S,
    mappings: &'a Mappings,
    header_parser: HeaderParser,
    dates: DateReader,
    region: PageRegion,
}

impl<'a, S: DocumentSource> Pipeline<'a, S> {
    pub fn new(source: &'a S, mappings: &'a Mappings) -> Result<Self> {
        Ok(Self {
            source,
            mappings,
            header_parser: HeaderParser::new()?,
            dates: DateReader::new()?,
            region: RESULTS_REGION,
        })
    }

    /// Runs every document through the pipeline in order, accumulating into
    /// `dataset`. A failing document is recorded and the batch moves on.
    pub fn ingest_batch(&self, paths: &[PathBuf], dataset: &mut Dataset) -> BatchReport {
        let mut classifier = DocumentClassifier::new();

        let mut report = paths.iter().fold(BatchReport::default(), |mut report, path| {
            let head = self.source.head_bytes(path).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "failed to read document head");
                Vec::new()
            });
            if !classifier.classify(path, &head) {
                return report;
            }

            match self.ingest_document(path, dataset) {
                Ok(DocumentOutcome::Ingested { rows }) => {
                    debug!(path = %path.display(), rows, "document ingested");
                    report.ingested.push((path.clone(), rows));
                }
                Ok(DocumentOutcome::Skipped) => {
                    info!(path = %path.display(), "skipped paired discipline");
                    report.skipped_documents.push(path.clone());
                }
                Ok(DocumentOutcome::EmptyTable) => {
                    warn!(path = %path.display(), "unable to scan results table");
                    report.empty_table_documents.push(path.clone());
                }
                Err(error) => {
                    warn!(path = %path.display(), kind = error.kind(), error = %error, "document failed");
                    report.failures.push(DocumentFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
            report
        });

        report.invalid_documents = classifier.into_rejected();
        report
    }

    /// Header, taxonomy, table and resolution for one classified document.
    ///
    /// Competition and category rows are bound before the table is read, so
    /// they persist even when the table later fails.
    pub fn ingest_document(&self, path: &Path, dataset: &mut Dataset) -> Result<DocumentOutcome, DocumentError> {
        let first_page = self
            .source
            .first_page_text(path)
            .map_err(|err| DocumentError::Extraction(format!("{err:#}")))?;
        let header = self.header_parser.parse(&first_page, self.mappings)?;
        let ids = resolve_header(dataset, &header, &self.dates);

        if is_paired_discipline(&header.category_name) {
            return Ok(DocumentOutcome::Skipped);
        }

        let pages = self
            .source
            .table_region_pages(path, self.region)
            .map_err(|err| DocumentError::Extraction(format!("{err:#}")))?;
        let raw = concat_tables(pages.iter().map(|page| parse_layout_page(page)).collect());
        if raw.rows.is_empty() {
            return Ok(DocumentOutcome::EmptyTable);
        }

        let rows = clean_table(raw)?;
        let appended = resolve_rows(dataset, &rows, self.mappings, ids);
        Ok(DocumentOutcome::Ingested { rows: appended })
    }
}
