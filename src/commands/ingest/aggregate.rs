//! Read-only derivations over a finished dataset: rank buckets and best-result
//! selections.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::types::{Dataset, Id, ResultRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankBin {
    Gold,
    Silver,
    Bronze,
    FourToFive,
    SixToTen,
    ElevenToFifteen,
    SixteenToTwenty,
    TwentyOneToThirty,
    ThirtyOneToForty,
    FortyOneToFifty,
    OverFifty,
}

impl RankBin {
    pub fn label(self) -> &'static str {
        match self {
            RankBin::Gold => "Gold",
            RankBin::Silver => "Silver",
            RankBin::Bronze => "Bronze",
            RankBin::FourToFive => "4-5",
            RankBin::SixToTen => "6-10",
            RankBin::ElevenToFifteen => "11-15",
            RankBin::SixteenToTwenty => "16-20",
            RankBin::TwentyOneToThirty => "21-30",
            RankBin::ThirtyOneToForty => "31-40",
            RankBin::FortyOneToFifty => "41-50",
            RankBin::OverFifty => "50+",
        }
    }
}

/// Ranks are positive, so 0 never reaches here; it lands in `Gold` only to
/// keep the function total.
pub fn rank_bin(rank: u32) -> RankBin {
    match rank {
        0..=1 => RankBin::Gold,
        2 => RankBin::Silver,
        3 => RankBin::Bronze,
        4..=5 => RankBin::FourToFive,
        6..=10 => RankBin::SixToTen,
        11..=15 => RankBin::ElevenToFifteen,
        16..=20 => RankBin::SixteenToTwenty,
        21..=30 => RankBin::TwentyOneToThirty,
        31..=40 => RankBin::ThirtyOneToForty,
        41..=50 => RankBin::FortyOneToFifty,
        _ => RankBin::OverFifty,
    }
}

/// Best result per `(competitor_id, program_type_id)`.
pub type PersonalBests = BTreeMap<(Id, Id), Id>;

/// Best result per `(section_id | club_id, category_id)`.
pub type Records = BTreeMap<(Id, Id), Id>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    /// Parallel to `Dataset::results`.
    pub rank_bins: Vec<RankBin>,
    pub personal_bests: PersonalBests,
    pub section_records: Records,
    pub club_records: Records,
}

pub fn aggregate(dataset: &Dataset) -> Aggregates {
    let results = &dataset.results;

    Aggregates {
        rank_bins: results.iter().map(|row| rank_bin(row.rank)).collect(),
        personal_bests: best_by(results, |row| {
            let program_type = dataset.categories.get(row.category_id)?.program_type;
            Some((row.competitor_id?, program_type.id()))
        }),
        section_records: best_by(results, |row| Some((row.section_id?, row.category_id))),
        club_records: best_by(results, |row| Some((row.club_id?, row.category_id))),
    }
}

/// Max-points row id per group. Only a strictly higher score displaces the
/// current best, so ties keep the earliest row. Rows whose key is `None` are
/// left out.
fn best_by<F>(results: &[ResultRow], key_of: F) -> BTreeMap<(Id, Id), Id>
where
    F: Fn(&ResultRow) -> Option<(Id, Id)>,
{
    let mut best = BTreeMap::new();

    for (result_id, row) in results.iter().enumerate() {
        let Some(key) = key_of(row) else {
            continue;
        };

        match best.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(result_id);
            }
            Entry::Occupied(mut slot) => {
                if row.points > results[*slot.get()].points {
                    slot.insert(result_id);
                }
            }
        }
    }

    best
}
