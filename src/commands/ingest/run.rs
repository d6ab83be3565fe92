use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::aggregate::{Aggregates, aggregate};
use super::pipeline::{BatchReport, Pipeline};
use super::report_store::{create_report_store, write_report};
use super::source::{Pdftotext, pdftotext_version};
use super::types::Dataset;
use crate::cli::IngestArgs;
use crate::mappings::Mappings;
use crate::model::{FailureEntry, IngestCounts, IngestPaths, IngestRunManifest, ToolVersions};
use crate::util::{discover_pdfs, ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

pub const DB_FILENAME: &str = "skate_results.sqlite";

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let out_dir = args.out_dir.clone();
    let manifest_dir = out_dir.join("manifests");
    ensure_directory(&manifest_dir)?;

    let db_path = args.db_path.clone().unwrap_or_else(|| out_dir.join(DB_FILENAME));
    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(pdf_dir = %args.pdf_dir.display(), run_id = %run_id, "starting ingest");

    let tool_versions = ToolVersions {
        pdftotext: pdftotext_version()?,
    };

    let mut warnings = Vec::new();
    let mappings = Mappings::load(&args.maps_dir, &mut warnings)?;

    let mut pdf_paths = discover_pdfs(&args.pdf_dir)?;
    if pdf_paths.is_empty() {
        warn!(pdf_dir = %args.pdf_dir.display(), "no PDFs found");
        warnings.push(format!("no PDFs found in {}", args.pdf_dir.display()));
    }
    if let Some(max_docs) = args.max_docs {
        pdf_paths.truncate(max_docs);
    }

    let source = Pdftotext;
    let pipeline = Pipeline::new(&source, &mappings)?;
    let mut dataset = Dataset::default();
    let report = pipeline.ingest_batch(&pdf_paths, &mut dataset);

    let aggregates = aggregate(&dataset);

    let mut connection = create_report_store(&db_path)?;
    write_report(&mut connection, &dataset, &aggregates)?;
    info!(path = %db_path.display(), "wrote report store");

    let counts = collect_counts(&report, &dataset, &aggregates);
    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        tool_versions,
        paths: IngestPaths {
            pdf_dir: args.pdf_dir.display().to_string(),
            maps_dir: args.maps_dir.display().to_string(),
            out_dir: out_dir.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts: counts.clone(),
        invalid_documents: display_paths(&report.invalid_documents),
        empty_table_documents: display_paths(&report.empty_table_documents),
        skipped_documents: display_paths(&report.skipped_documents),
        failures: report
            .failures
            .iter()
            .map(|failure| FailureEntry {
                path: failure.path.display().to_string(),
                kind: failure.error.kind().to_string(),
                message: failure.error.to_string(),
            })
            .collect(),
        warnings,
    };

    write_json_pretty(&run_manifest_path, &manifest)?;
    info!(path = %run_manifest_path.display(), "wrote ingest run manifest");
    info!(
        documents = counts.documents_seen,
        ingested = counts.documents_ingested,
        failed = counts.documents_failed,
        results = counts.results,
        "ingest completed"
    );

    Ok(())
}

pub fn collect_counts(report: &BatchReport, dataset: &Dataset, aggregates: &Aggregates) -> IngestCounts {
    IngestCounts {
        documents_seen: report.documents_seen(),
        documents_valid: report.documents_valid(),
        documents_ingested: report.ingested.len(),
        documents_skipped: report.skipped_documents.len(),
        documents_failed: report.failures.len(),
        competitions: dataset.competitions.len(),
        categories: dataset.categories.len(),
        clubs: dataset.clubs.len(),
        sections: dataset.sections.len(),
        competitors: dataset.competitors.len(),
        results: dataset.results.len(),
        personal_bests: aggregates.personal_bests.len(),
        section_records: aggregates.section_records.len(),
        club_records: aggregates.club_records.len(),
    }
}

fn display_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    paths
        .iter()
        .map(|path| path.as_ref().display().to_string())
        .collect()
}
