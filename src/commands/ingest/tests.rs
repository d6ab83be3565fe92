use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};

use super::aggregate::aggregate;
use super::pipeline::Pipeline;
use super::run::collect_counts;
use super::source::DocumentSource;
use super::types::{Dataset, PageRegion, RESULTS_REGION};
use crate::mappings::{KeyMatch, Mappings, NameLookup};

struct FakeDocument {
    head: Vec<u8>,
    first_page: Option<String>,
    table_pages: Option<Vec<String>>,
}

/// In-memory documents keyed by path; `None` text stands for a failed extraction.
#[derive(Default)]
struct FakeSource {
    documents: HashMap<PathBuf, FakeDocument>,
}

impl FakeSource {
    fn with(mut self, path: &str, head: &[u8], first_page: Option<&str>, table_pages: Option<Vec<String>>) -> Self {
        self.documents.insert(
            PathBuf::from(path),
            FakeDocument {
                head: head.to_vec(),
                first_page: first_page.map(ToOwned::to_owned),
                table_pages,
            },
        );
        self
    }

    fn with_results(self, path: &str, first_page: &str, table_pages: Vec<String>) -> Self {
        self.with(path, b"%PDF-1.6\n", Some(first_page), Some(table_pages))
    }

    fn document(&self, path: &Path) -> Result<&FakeDocument> {
        self.documents
            .get(path)
            .ok_or_else(|| anyhow!("no such document: {}", path.display()))
    }
}

impl DocumentSource for FakeSource {
    fn head_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.documents
            .get(path)
            .map(|document| document.head.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing fixture"))
    }

    fn first_page_text(&self, path: &Path) -> Result<String> {
        match &self.document(path)?.first_page {
            Some(text) => Ok(text.clone()),
            None => bail!("pdftotext returned non-zero exit status for {}", path.display()),
        }
    }

    fn table_region_pages(&self, path: &Path, region: PageRegion) -> Result<Vec<String>> {
        assert_eq!(region, RESULTS_REGION);
        match &self.document(path)?.table_pages {
            Some(pages) => Ok(pages.clone()),
            None => bail!("pdftotext crashed on {}", path.display()),
        }
    }
}

fn layout_line(rank: &str, competitor: &str, club: &str, section: &str, points: &str) -> String {
    format!("{rank:>4}  {competitor:<20}  {club:<18}  {section:<10}  {points:>8}")
}

fn results_page(rows: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut lines = vec![layout_line("Rank", "Competitor(s)", "Club", "Section", "Points")];
    for (rank, competitor, club, section, points) in rows {
        lines.push(layout_line(rank, competitor, club, section, points));
    }
    lines.join("\n")
}

fn header_page(competition: &str, date: &str, category: &str) -> String {
    format!("{competition}\nCalgary, AB\n{date}\n{category}\nResult Summary")
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn failing_document_is_excluded_and_batch_continues() {
    let source = FakeSource::default()
        .with_results(
            "pdfs/fall-classic-CR.pdf",
            &header_page("Fall Classic", "October 14-15, 2023", "STAR 5 Women U13"),
            vec![results_page(&[
                ("1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "30.25"),
                ("2", "Bea Jones", "Glencoe Club", "AB/NT/NU", "28.10"),
            ])],
        )
        .with_results(
            "pdfs/winter-open-CR.pdf",
            &header_page("Winter Open", "January 20, 2024", "STAR 6 Women"),
            vec![results_page(&[
                ("1", "Cy Lee", "Banff FSC", "AB/NT/NU", "31.00"),
                ("2", "Dee Park", "Canmore SC", "AB/NT/NU", "n/a"),
            ])],
        )
        .with_results(
            "pdfs/spring-skate-CR.pdf",
            &header_page("Spring Skate", "March 2, 2024", "STAR 5 Women U13"),
            vec![results_page(&[
                ("1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "33.40"),
                ("WD", "Eve White", "Calgary FSC", "AB/NT/NU", ""),
            ])],
        );
    let mappings = Mappings::default();
    let pipeline = Pipeline::new(&source, &mappings).expect("pipeline builds");
    let mut dataset = Dataset::default();

    let report = pipeline.ingest_batch(
        &paths(&[
            "pdfs/fall-classic-CR.pdf",
            "pdfs/winter-open-CR.pdf",
            "pdfs/spring-skate-CR.pdf",
        ]),
        &mut dataset,
    );

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, PathBuf::from("pdfs/winter-open-CR.pdf"));
    assert_eq!(report.failures[0].error.kind(), "table");
    assert_eq!(report.ingested.len(), 2);

    assert_eq!(dataset.results.len(), 3);
    let winter = dataset.competitions.id_of("Winter Open").expect("competition persists");
    assert!(dataset.results.iter().all(|row| row.competition_id != winter));
    assert!(dataset.competitors.id_of("Cy Lee").is_none());

    let calgary = dataset.clubs.id_of("Calgary FSC");
    assert!(calgary.is_some());
    assert_eq!(dataset.results[0].club_id, calgary);
    assert_eq!(dataset.results[2].club_id, calgary);
    assert_eq!(dataset.results[0].competitor_id, dataset.results[2].competitor_id);
    assert!(dataset.clubs.id_of("Canmore SC").is_none());

    let aggregates = aggregate(&dataset);
    let category = dataset.categories.id_of("STAR 5 Women U13").expect("category");
    let club_record = aggregates
        .club_records
        .get(&(calgary.expect("club id"), category))
        .copied();
    assert_eq!(club_record, Some(2));
    assert_eq!(aggregates.rank_bins.len(), 3);
}

#[test]
fn club_mapping_merges_spellings_across_documents() {
    let source = FakeSource::default()
        .with_results(
            "pdfs/a-CR.pdf",
            &header_page("Sectionals", "November 3-5, 2023", "Novice Women FS"),
            vec![results_page(&[("1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "61.02")])],
        )
        .with_results(
            "pdfs/b-CR.pdf",
            &header_page("Challenge", "December 1, 2023", "Novice Women FS"),
            vec![results_page(&[(
                "1",
                "Bea Jones",
                "Calgary Figure SC",
                "AB/NT/NU",
                "58.90",
            )])],
        );
    let mappings = Mappings {
        clubs: NameLookup::new(KeyMatch::Exact, [("Calgary Figure SC", "Calgary FSC")]),
        ..Mappings::default()
    };
    let pipeline = Pipeline::new(&source, &mappings).expect("pipeline builds");
    let mut dataset = Dataset::default();

    pipeline.ingest_batch(&paths(&["pdfs/a-CR.pdf", "pdfs/b-CR.pdf"]), &mut dataset);

    assert_eq!(dataset.clubs.len(), 1);
    assert_eq!(dataset.results[0].club_id, dataset.results[1].club_id);
    assert_eq!(dataset.categories.len(), 1);
    assert_eq!(dataset.competitions.len(), 2);
    assert_eq!(
        dataset
            .competitions
            .get(1)
            .and_then(|competition| competition.season.as_deref()),
        Some("2024")
    );
}

#[test]
fn invalid_skipped_empty_and_unreadable_documents_are_reported_apart() {
    let source = FakeSource::default()
        .with(
            "pdfs/removed-CR.pdf",
            b"<!DOCTYPE html><p>This document has been removed</p>",
            None,
            None,
        )
        .with_results(
            "pdfs/pairs-CR.pdf",
            &header_page("Fall Classic", "October 2023", "Juvenile Pairs FS"),
            vec![results_page(&[("1", "Ava Smith & Cy Lee", "Calgary FSC", "AB/NT/NU", "20.00")])],
        )
        .with_results(
            "pdfs/blank-CR.pdf",
            &header_page("Fall Classic", "October 2023", "STAR 3 Women"),
            vec![String::new(), "   \n".to_string()],
        )
        .with("pdfs/broken-CR.pdf", b"%PDF-1.4", None, None)
        .with(
            "pdfs/crashed-CR.pdf",
            b"%PDF-1.4",
            Some("Fall Classic\nOctober 2023\nSTAR 4 Women"),
            None,
        );
    let mappings = Mappings::default();
    let pipeline = Pipeline::new(&source, &mappings).expect("pipeline builds");
    let mut dataset = Dataset::default();

    let report = pipeline.ingest_batch(
        &paths(&[
            "pdfs/removed-CR.pdf",
            "pdfs/pairs-CR.pdf",
            "pdfs/blank-CR.pdf",
            "pdfs/broken-CR.pdf",
            "pdfs/crashed-CR.pdf",
            "pdfs/vanished-CR.pdf",
        ]),
        &mut dataset,
    );

    assert_eq!(
        report.invalid_documents,
        paths(&["pdfs/removed-CR.pdf", "pdfs/vanished-CR.pdf"])
    );
    assert_eq!(report.skipped_documents, paths(&["pdfs/pairs-CR.pdf"]));
    assert_eq!(report.empty_table_documents, paths(&["pdfs/blank-CR.pdf"]));
    assert_eq!(
        report
            .failures
            .iter()
            .map(|failure| (failure.path.clone(), failure.error.kind()))
            .collect::<Vec<_>>(),
        vec![
            (PathBuf::from("pdfs/broken-CR.pdf"), "extraction"),
            (PathBuf::from("pdfs/crashed-CR.pdf"), "extraction"),
        ]
    );
    assert!(report.ingested.is_empty());

    // Header-level rows of skipped and failed documents stay behind.
    assert!(dataset.categories.id_of("Juvenile Pairs FS").is_some());
    assert!(dataset.categories.id_of("STAR 4 Women").is_some());
    assert!(dataset.results.is_empty());

    let counts = collect_counts(&report, &dataset, &aggregate(&dataset));
    assert_eq!(counts.documents_seen, 6);
    assert_eq!(counts.documents_valid, 4);
    assert_eq!(counts.documents_skipped, 1);
    assert_eq!(counts.documents_failed, 2);
    assert_eq!(counts.competitions, 1);
    assert_eq!(counts.results, 0);
}

#[test]
fn multi_page_tables_are_concatenated_before_cleaning() {
    let source = FakeSource::default().with_results(
        "pdfs/provincials-CR.pdf",
        &header_page("Provincial Championships", "February 9, 2024", "Juvenile Women U14 FS"),
        vec![
            results_page(&[
                ("1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "55.00"),
                ("2", "Bea Jones", "Glencoe Club", "AB/NT/NU", "54.00"),
            ]),
            results_page(&[("3", "Cy Lee", "Banff FSC", "BC/YT", "41.50")]),
        ],
    );
    let mappings = Mappings::default();
    let pipeline = Pipeline::new(&source, &mappings).expect("pipeline builds");
    let mut dataset = Dataset::default();

    let report = pipeline.ingest_batch(&paths(&["pdfs/provincials-CR.pdf"]), &mut dataset);

    assert_eq!(report.ingested, vec![(PathBuf::from("pdfs/provincials-CR.pdf"), 3)]);
    assert_eq!(
        dataset.results.iter().map(|row| row.rank).collect::<Vec<u32>>(),
        vec![1, 2, 3]
    );
    assert_eq!(dataset.sections.len(), 2);

    let competition = dataset.competitions.get(0).expect("competition");
    assert!(competition.is_championship);
    assert_eq!(competition.start_date, "February 2024");
    assert_eq!(competition.season.as_deref(), Some("2024"));
}
