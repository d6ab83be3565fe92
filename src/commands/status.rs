use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::ingest::{DB_FILENAME, REPORT_TABLES, count_rows};
use crate::model::{IngestRunManifest, PdfInventoryManifest};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.out_dir.join("manifests");
    let inventory_path = manifest_dir.join("pdf_inventory.json");

    info!(out_dir = %args.out_dir.display(), "status requested");

    let mut db_path = args.out_dir.join(DB_FILENAME);

    match latest_run_manifest(&manifest_dir)? {
        Some(run_manifest_path) => {
            let raw = fs::read(&run_manifest_path)
                .with_context(|| format!("failed to read {}", run_manifest_path.display()))?;
            let manifest: IngestRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", run_manifest_path.display()))?;

            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                pdftotext = %manifest.tool_versions.pdftotext,
                documents_seen = manifest.counts.documents_seen,
                documents_ingested = manifest.counts.documents_ingested,
                documents_skipped = manifest.counts.documents_skipped,
                documents_failed = manifest.counts.documents_failed,
                invalid = manifest.invalid_documents.len(),
                empty_tables = manifest.empty_table_documents.len(),
                "loaded ingest run manifest"
            );
            for failure in &manifest.failures {
                warn!(path = %failure.path, kind = %failure.kind, error = %failure.message, "document failed in last run");
            }

            db_path = PathBuf::from(manifest.paths.db_path);
        }
        None => warn!(path = %manifest_dir.display(), "no ingest run manifest found"),
    }

    if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: PdfInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            pdf_count = inventory.pdf_count,
            invalid = inventory.invalid_documents.len(),
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;

        for table in REPORT_TABLES {
            let rows = count_rows(&conn, &format!("SELECT COUNT(*) FROM {table}")).unwrap_or(0);
            info!(path = %db_path.display(), table, rows, "table status");
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// Run manifests carry a compact UTC timestamp, so the greatest name is the newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("ingest_run_") && name.ends_with(".json"))
            .unwrap_or(false);

        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
