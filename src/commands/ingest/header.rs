use regex::Regex;

use super::types::{DocumentError, DocumentHeader};
use crate::mappings::Mappings;

/// Lines after the competition name that may hold the date.
const DATE_SCAN_LINES: std::ops::RangeInclusive<usize> = 1..=3;

pub struct HeaderParser {
    month_regex: Regex,
}

impl HeaderParser {
    pub fn new() -> anyhow::Result<Self> {
        let month_regex = Regex::new(
            r"(?i)\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec|January|February|March|April|June|July|August|September|October|November|December)\b",
        )?;
        Ok(Self { month_regex })
    }

    /// Pulls the competition name, start date and category name off the first
    /// page, then normalizes both names through the mapping tables.
    pub fn parse(&self, first_page: &str, mappings: &Mappings) -> Result<DocumentHeader, DocumentError> {
        let lines = first_page.lines().collect::<Vec<&str>>();
        let raw_competition = lines
            .first()
            .copied()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| DocumentError::Header("first page has no text".to_string()))?;

        let mut start_date = None;
        let mut date_line = None;
        let mut raw_category = None;

        for index in DATE_SCAN_LINES {
            let Some(line) = lines.get(index) else {
                break;
            };

            if let Some(literal) = mappings.date_edge_cases.find_in(line) {
                start_date = Some(literal.to_string());
                raw_category = lines.get(index + 1).copied();
                break;
            }

            if let Some(month) = self.month_regex.find(line) {
                date_line = Some(&line[month.start()..]);
                raw_category = lines.get(index + 1).copied();
                break;
            }
        }

        let start_date = start_date.unwrap_or_else(|| best_effort_date(date_line.unwrap_or("")));
        let raw_category = raw_category.ok_or_else(|| {
            DocumentError::Header(format!(
                "no category line located below the date in '{}'",
                raw_competition.trim()
            ))
        })?;

        Ok(DocumentHeader {
            competition_name: mappings.competitions.normalize(raw_competition),
            start_date,
            category_name: mappings.categories.normalize(raw_category),
        })
    }
}

/// Reduces a date line such as `November 3-5, 2023` to `November 2023`.
/// Callers pass the line from the month word onwards.
fn best_effort_date(date_line: &str) -> String {
    let tokens = date_line.split_whitespace().collect::<Vec<&str>>();
    let first = tokens.first().copied().unwrap_or("");
    let last = tokens.last().copied().unwrap_or("");
    format!("{first} {last}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::{DateEdgeCases, KeyMatch, NameLookup};

    fn parser() -> HeaderParser {
        HeaderParser::new().expect("header regex compiles")
    }

    #[test]
    fn month_line_supplies_date_and_next_line_category() {
        let text = "Skate Calgary Invitational\nCalgary, AB\nNovember 3-5, 2023\nJuvenile Women U14 FS\nRank Name";

        let header = parser()
            .parse(text, &Mappings::default())
            .expect("header should parse");

        assert_eq!(header.competition_name, "Skate Calgary Invitational");
        assert_eq!(header.start_date, "November 2023");
        assert_eq!(header.category_name, "Juvenile Women U14 FS");
    }

    #[test]
    fn month_match_is_case_insensitive_and_whole_word() {
        let text = "Sectionals\nMARCH 1 2024\nSenior Women SP";
        let header = parser()
            .parse(text, &Mappings::default())
            .expect("header should parse");
        assert_eq!(header.start_date, "MARCH 2024");

        // "Mayfield" must not be taken for a month.
        let text = "Sectionals\nMayfield Arena\nOct 2 2024\nSenior Men FS";
        let header = parser()
            .parse(text, &Mappings::default())
            .expect("header should parse");
        assert_eq!(header.start_date, "Oct 2024");
        assert_eq!(header.category_name, "Senior Men FS");
    }

    #[test]
    fn edge_case_literal_wins_over_month_heuristic() {
        let mappings = Mappings {
            date_edge_cases: DateEdgeCases::new([("Thanksgiving Weekend", "October 7 2023")]),
            ..Mappings::default()
        };
        let text = "Fall Fest\nThanksgiving Weekend December\nSTAR 5 Women";

        let header = parser().parse(text, &mappings).expect("header should parse");

        assert_eq!(header.start_date, "October 7 2023");
        assert_eq!(header.category_name, "STAR 5 Women");
    }

    #[test]
    fn names_pass_through_normalization_lookups() {
        let mappings = Mappings {
            competitions: NameLookup::new(
                KeyMatch::CaseInsensitive,
                [("skate ab sectionals", "Skate Alberta Sectionals")],
            ),
            categories: NameLookup::new(
                KeyMatch::CaseInsensitive,
                [("pre novice women fs", "Pre-Novice Women FS")],
            ),
            ..Mappings::default()
        };
        let text = "SKATE AB SECTIONALS \nSeptember 29 2023\n Pre Novice Women FS ";

        let header = parser().parse(text, &mappings).expect("header should parse");

        assert_eq!(header.competition_name, "Skate Alberta Sectionals");
        assert_eq!(header.category_name, "Pre-Novice Women FS");
    }

    #[test]
    fn missing_date_line_is_a_header_error() {
        let text = "Competition\nno date here\nstill nothing\nnor here\nCategory";
        let error = parser()
            .parse(text, &Mappings::default())
            .expect_err("no category can be located");
        assert_eq!(error.kind(), "header");

        let error = parser()
            .parse("", &Mappings::default())
            .expect_err("empty page has no header");
        assert_eq!(error.kind(), "header");
    }

    #[test]
    fn best_effort_date_keeps_first_and_last_tokens() {
        assert_eq!(best_effort_date("January 12 - 14, 2024"), "January 2024");
        assert_eq!(best_effort_date(" November 4,  2023 "), "November 2023");
        assert_eq!(best_effort_date(""), "");
    }

    #[test]
    fn padded_date_line_with_weekday_still_yields_month_and_year() {
        let text = "Fall Classic\n Saturday, November 4, 2023\nSTAR 5 Women";

        let header = parser()
            .parse(text, &Mappings::default())
            .expect("header should parse");

        assert_eq!(header.start_date, "November 2023");
        assert_eq!(header.category_name, "STAR 5 Women");

        let dates = crate::commands::ingest::taxonomy::DateReader::new().expect("date regexes compile");
        assert_eq!(dates.parse(&header.start_date), chrono::NaiveDate::from_ymd_opt(2023, 11, 1));
    }
}
