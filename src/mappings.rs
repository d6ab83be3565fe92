//! Name-normalization and date edge-case lookups.
//!
//! Each mapping file is a two-column table with a header row: the raw key as
//! scraped from a result sheet, then the value to substitute. The pipeline only
//! ever sees the in-memory lookups built here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const COMPETITION_MAP_FILE: &str = "comp_map.csv";
pub const CATEGORY_MAP_FILE: &str = "category_mapping.csv";
pub const CLUB_MAP_FILE: &str = "club_mapping.csv";
pub const COMPETITOR_MAP_FILE: &str = "competitor_mapping.csv";
pub const SECTION_MAP_FILE: &str = "section_mapping.csv";
pub const DATE_EDGE_CASES_FILE: &str = "date_edge_cases.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Keys and inputs are trimmed and compared lowercased.
    CaseInsensitive,
    /// Keys must equal the input byte for byte.
    Exact,
}

#[derive(Debug, Clone)]
pub struct NameLookup {
    key_match: KeyMatch,
    entries: HashMap<String, String>,
}

impl NameLookup {
    pub fn new<I, K, V>(key_match: KeyMatch, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();
        for (key, value) in pairs {
            let key = match key_match {
                KeyMatch::CaseInsensitive => key.into().trim().to_lowercase(),
                KeyMatch::Exact => key.into(),
            };
            // First row for a key wins, later duplicates are ignored.
            entries.entry(key).or_insert_with(|| value.into());
        }
        Self { key_match, entries }
    }

    pub fn empty(key_match: KeyMatch) -> Self {
        Self {
            key_match,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the mapped value, or the input itself when nothing matches.
    ///
    /// Case-insensitive lookups hand back unmapped input trimmed; exact lookups
    /// hand it back untouched.
    pub fn normalize(&self, raw: &str) -> String {
        match self.key_match {
            KeyMatch::CaseInsensitive => {
                let trimmed = raw.trim();
                self.entries
                    .get(&trimmed.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| trimmed.to_string())
            }
            KeyMatch::Exact => self
                .entries
                .get(raw)
                .cloned()
                .unwrap_or_else(|| raw.to_string()),
        }
    }
}

/// Literal substitutions for header date lines the month heuristic cannot read.
///
/// Order follows the source file; the first key found as a substring wins.
#[derive(Debug, Clone, Default)]
pub struct DateEdgeCases {
    entries: Vec<(String, String)>,
}

impl DateEdgeCases {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .filter(|(key, _)| !key.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find_in(&self, line: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| line.contains(key.as_str()))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Mappings {
    pub competitions: NameLookup,
    pub categories: NameLookup,
    pub clubs: NameLookup,
    pub competitors: NameLookup,
    pub sections: NameLookup,
    pub date_edge_cases: DateEdgeCases,
}

impl Default for Mappings {
    fn default() -> Self {
        Self {
            competitions: NameLookup::empty(KeyMatch::CaseInsensitive),
            categories: NameLookup::empty(KeyMatch::CaseInsensitive),
            clubs: NameLookup::empty(KeyMatch::Exact),
            competitors: NameLookup::empty(KeyMatch::Exact),
            sections: NameLookup::empty(KeyMatch::Exact),
            date_edge_cases: DateEdgeCases::default(),
        }
    }
}

impl Mappings {
    /// Loads every mapping file under `maps_dir`. Absent files become empty
    /// lookups; the competitor and section tables are optional and only the
    /// core four are reported through `warnings` when missing.
    pub fn load(maps_dir: &Path, warnings: &mut Vec<String>) -> Result<Self> {
        let competitions = NameLookup::new(
            KeyMatch::CaseInsensitive,
            load_optional_pairs(&maps_dir.join(COMPETITION_MAP_FILE), warnings)?,
        );
        let categories = NameLookup::new(
            KeyMatch::CaseInsensitive,
            load_optional_pairs(&maps_dir.join(CATEGORY_MAP_FILE), warnings)?,
        );
        let clubs = NameLookup::new(
            KeyMatch::Exact,
            load_optional_pairs(&maps_dir.join(CLUB_MAP_FILE), warnings)?,
        );
        let competitors = NameLookup::new(
            KeyMatch::Exact,
            load_pairs_if_present(&maps_dir.join(COMPETITOR_MAP_FILE))?,
        );
        let sections = NameLookup::new(
            KeyMatch::Exact,
            load_pairs_if_present(&maps_dir.join(SECTION_MAP_FILE))?,
        );
        let date_edge_cases =
            DateEdgeCases::new(load_optional_pairs(&maps_dir.join(DATE_EDGE_CASES_FILE), warnings)?);

        info!(
            maps_dir = %maps_dir.display(),
            competitions = competitions.len(),
            categories = categories.len(),
            clubs = clubs.len(),
            competitors = competitors.len(),
            sections = sections.len(),
            date_edge_cases = date_edge_cases.len(),
            "loaded mapping tables"
        );

        Ok(Self {
            competitions,
            categories,
            clubs,
            competitors,
            sections,
            date_edge_cases,
        })
    }
}

fn load_optional_pairs(path: &Path, warnings: &mut Vec<String>) -> Result<Vec<(String, String)>> {
    if !path.exists() {
        let warning = format!("mapping file missing, using empty lookup: {}", path.display());
        warn!(path = %path.display(), "mapping file missing");
        warnings.push(warning);
        return Ok(Vec::new());
    }

    load_pairs_if_present(path)
}

fn load_pairs_if_present(path: &Path) -> Result<Vec<(String, String)>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_mapping_pairs(&raw))
}

/// Reads the key/value columns of a mapping table, skipping the header row.
pub fn parse_mapping_pairs(text: &str) -> Vec<(String, String)> {
    parse_csv_rows(text.trim_start_matches('\u{feff}'))
        .into_iter()
        .skip(1)
        .filter_map(|mut row| {
            if row.len() < 2 {
                return None;
            }
            let value = row.swap_remove(1);
            let key = row.swap_remove(0);
            Some((key, value))
        })
        .collect()
}

/// Quote-aware comma splitter tolerant of CRLF line endings.
fn parse_csv_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
