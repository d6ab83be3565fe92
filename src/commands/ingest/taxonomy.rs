//! Ordered keyword rules that classify a category name, plus season bucketing.
//!
//! All matching is case-sensitive substring matching against the normalized
//! category name; the first rule that fires decides.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::types::{CategoryType, ProgramType};

#[derive(Debug, Clone, Copy)]
pub struct CategoryTypeRule {
    /// Keyword that must also be present for the rule to apply.
    pub requires: Option<&'static str>,
    pub any_of: &'static [&'static str],
    pub category_type: CategoryType,
}

impl CategoryTypeRule {
    fn matches(&self, name: &str) -> bool {
        self.requires.is_none_or(|keyword| name.contains(keyword))
            && self.any_of.iter().any(|keyword| name.contains(keyword))
    }
}

/// Pre-Juvenile U13 and other plain Juvenile events are not competitive,
/// hence the second rule's narrower keyword list.
pub const CATEGORY_TYPE_RULES: &[CategoryTypeRule] = &[
    CategoryTypeRule {
        requires: None,
        any_of: &["Senior", "Junior", "Novice", "Pre-Novice"],
        category_type: CategoryType::Competitive,
    },
    CategoryTypeRule {
        requires: Some("Juvenile"),
        any_of: &["U11", "U12", "U14", "U15", "Men", "Dance", "Pairs"],
        category_type: CategoryType::Competitive,
    },
    CategoryTypeRule {
        requires: None,
        any_of: &["Adult"],
        category_type: CategoryType::Adult,
    },
    CategoryTypeRule {
        requires: None,
        any_of: &["Level"],
        category_type: CategoryType::SpecialOlympics,
    },
];

pub const DEFAULT_CATEGORY_TYPE: CategoryType = CategoryType::StarSkate;

pub const PROGRAM_TYPE_RULES: &[(&str, ProgramType)] = &[
    ("CS", ProgramType::CreativeSkatingSkill),
    ("Triathlon", ProgramType::Triathalon),
    ("Elements", ProgramType::Elements),
    ("Special Olympics", ProgramType::SpecialOlympics),
    ("SP", ProgramType::ShortProgram),
    ("FS", ProgramType::FreeProgram),
    ("Artistic", ProgramType::Artistic),
];

pub const DEFAULT_PROGRAM_TYPE: ProgramType = ProgramType::Combined;

/// Disciplines this dataset does not cover.
pub const PAIRED_DISCIPLINE_KEYWORDS: &[&str] = &["Pairs", "Pair", "Dance", "Couples"];

pub fn category_type(category_name: &str) -> CategoryType {
    CATEGORY_TYPE_RULES
        .iter()
        .find(|rule| rule.matches(category_name))
        .map(|rule| rule.category_type)
        .unwrap_or(DEFAULT_CATEGORY_TYPE)
}

pub fn program_type(category_name: &str) -> ProgramType {
    PROGRAM_TYPE_RULES
        .iter()
        .find(|(keyword, _)| category_name.contains(keyword))
        .map(|(_, program_type)| *program_type)
        .unwrap_or(DEFAULT_PROGRAM_TYPE)
}

pub fn is_championship(competition_name: &str) -> bool {
    competition_name.contains("Championships")
}

pub fn is_paired_discipline(category_name: &str) -> bool {
    PAIRED_DISCIPLINE_KEYWORDS
        .iter()
        .any(|keyword| category_name.contains(keyword))
}

/// A season window; the label is the year it ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Season {
    pub fn label(&self) -> String {
        self.end.year().to_string()
    }

    /// Competitive seasons run December to November, all others April to March.
    pub fn containing(category_type: CategoryType, date: NaiveDate) -> Option<Self> {
        let (start_month, end_month, end_day) = match category_type {
            CategoryType::Competitive => (12, 11, 30),
            _ => (4, 3, 31),
        };

        let start_year = if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        };

        Some(Self {
            start: NaiveDate::from_ymd_opt(start_year, start_month, 1)?,
            end: NaiveDate::from_ymd_opt(start_year + 1, end_month, end_day)?,
        })
    }
}

/// Lenient reader for header date strings such as `November 2023`,
/// `Dec 1, 2023` or `2023-12-01`. Day defaults to the 1st; a month and a
/// four-digit year are both required.
pub struct DateReader {
    iso_regex: Regex,
    month_regex: Regex,
    year_regex: Regex,
    day_regex: Regex,
}

impl DateReader {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            iso_regex: Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b")?,
            month_regex: Regex::new(
                r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\b",
            )?,
            year_regex: Regex::new(r"\b((?:19|20)\d{2})\b")?,
            day_regex: Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?\b")?,
        })
    }

    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        if let Some(captures) = self.iso_regex.captures(text) {
            let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
            let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
            let day = captures.get(3)?.as_str().parse::<u32>().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        let month_match = self.month_regex.captures(text)?;
        let month_name = month_match.get(1)?.as_str().to_ascii_lowercase();
        let month = month_number(month_name.get(..3)?)?;
        let year = self
            .year_regex
            .captures(text)?
            .get(1)?
            .as_str()
            .parse::<i32>()
            .ok()?;

        let day = self
            .day_regex
            .captures_iter(text)
            .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
            .find(|day| (1..=31).contains(day))
            .unwrap_or(1);

        NaiveDate::from_ymd_opt(year, month, day).or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
    }
}

fn month_number(prefix: &str) -> Option<u32> {
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Season label for a competition, or `None` when the date cannot be read.
pub fn season_label(reader: &DateReader, category_type: CategoryType, start_date: &str) -> Option<String> {
    let date = reader.parse(start_date)?;
    Season::containing(category_type, date).map(|season| season.label())
}
