//! Dedup-and-append of scraped names onto the dataset's dimension tables.

use super::taxonomy::{self, DateReader};
use super::types::{
    Category, CleanRow, Competition, Dataset, Dimension, DocumentHeader, Id, ResultRow,
};
use crate::mappings::Mappings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIds {
    pub competition_id: Id,
    pub category_id: Id,
}

/// Binds the document's competition and category, inserting them on first
/// sight. An existing row is never updated, so the first document to name a
/// competition fixes its date and season.
pub fn resolve_header(dataset: &mut Dataset, header: &DocumentHeader, dates: &DateReader) -> HeaderIds {
    let category_type = taxonomy::category_type(&header.category_name);

    let (competition_id, _) = dataset
        .competitions
        .resolve_or_insert_with(&header.competition_name, || Competition {
            name: header.competition_name.clone(),
            start_date: header.start_date.clone(),
            season: taxonomy::season_label(dates, category_type, &header.start_date),
            is_championship: taxonomy::is_championship(&header.competition_name),
        });

    let (category_id, _) = dataset
        .categories
        .resolve_or_insert_with(&header.category_name, || Category {
            name: header.category_name.clone(),
            category_type,
            program_type: taxonomy::program_type(&header.category_name),
        });

    HeaderIds {
        competition_id,
        category_id,
    }
}

/// Appends one fact row per cleaned row. Club, competitor and section names
/// go through their exact-match lookups first; an empty cell resolves to no
/// entity. Returns the number of rows appended.
pub fn resolve_rows(dataset: &mut Dataset, rows: &[CleanRow], mappings: &Mappings, ids: HeaderIds) -> usize {
    for row in rows {
        let club_id = resolve_optional(&mut dataset.clubs, &mappings.clubs.normalize(&row.club));
        let competitor_id = resolve_optional(
            &mut dataset.competitors,
            &mappings.competitors.normalize(&row.competitor),
        );
        let section_id =
            resolve_optional(&mut dataset.sections, &mappings.sections.normalize(&row.section));

        dataset.results.push(ResultRow {
            competition_id: ids.competition_id,
            category_id: ids.category_id,
            club_id,
            competitor_id,
            section_id,
            rank: row.rank,
            points: row.points,
        });
    }

    rows.len()
}

fn resolve_optional(dimension: &mut Dimension<String>, name: &str) -> Option<Id> {
    if name.trim().is_empty() {
        return None;
    }
    Some(dimension.resolve_name(name))
}
