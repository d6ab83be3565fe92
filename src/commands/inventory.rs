use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::commands::ingest::DocumentClassifier;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::util::{discover_pdfs, now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.pdf_dir)?;

    if args.dry_run {
        info!(
            pdf_count = manifest.pdf_count,
            invalid = manifest.invalid_documents.len(),
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.out_dir.join("manifests").join("pdf_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        pdf_count = manifest.pdf_count,
        invalid = manifest.invalid_documents.len(),
        "inventory completed"
    );

    Ok(())
}

/// Hashes every document that sniffs as a PDF; the rest are listed as invalid.
pub fn build_manifest(pdf_dir: &Path) -> Result<PdfInventoryManifest> {
    let pdf_paths = discover_pdfs(pdf_dir)?;

    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", pdf_dir.display());
    }

    let mut classifier = DocumentClassifier::new();
    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        if !classifier.classify_file(&path) {
            continue;
        }

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
        let size_bytes = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        let sha256 = sha256_file(&path)?;

        pdfs.push(PdfEntry {
            filename,
            size_bytes,
            sha256,
        });
    }

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: pdf_dir.display().to_string(),
        pdf_count: pdfs.len(),
        pdfs,
        invalid_documents: classifier
            .into_rejected()
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
    })
}
