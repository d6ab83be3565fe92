use std::collections::HashMap;

use super::types::{CleanRow, RawTable, TableError};

/// Rank markers for entries that never received a placement. `MD` is a
/// known misread of one of them.
pub const NON_PLACEMENT_RANKS: &[&str] = &["WD", "DQ", "MD"];

/// Column that only carries values on scoring pages of dance summaries.
pub const FILLER_MARKER_COLUMN: &str = "FD";

pub const RANK_COLUMN: &str = "Rank";
pub const COMPETITOR_COLUMNS: &[&str] = &["Competitor(s)", "Competitor"];
pub const CLUB_COLUMN: &str = "Club";
pub const SECTION_COLUMN: &str = "Section";
pub const POINTS_COLUMN: &str = "Points";

const PLACEHOLDER_PREFIX: &str = "Unnamed";

/// A run of text in a layout line; words joined by single spaces stay together.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LayoutCell {
    start: usize,
    end: usize,
    text: String,
}

fn split_layout_cells(line: &str) -> Vec<LayoutCell> {
    let chars = line.chars().collect::<Vec<char>>();
    let mut cells = Vec::new();
    let mut index = 0usize;

    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }

        let start = index;
        let mut end = index;
        while end < chars.len() {
            if !chars[end].is_whitespace() {
                end += 1;
                continue;
            }
            let single_gap = chars[end] == ' '
                && chars
                    .get(end + 1)
                    .map(|next| !next.is_whitespace())
                    .unwrap_or(false);
            if !single_gap {
                break;
            }
            end += 1;
        }

        cells.push(LayoutCell {
            start,
            end,
            text: chars[start..end].iter().collect(),
        });
        index = end;
    }

    cells
}

fn overlap(a: &LayoutCell, b: &LayoutCell) -> usize {
    a.end.min(b.end).saturating_sub(a.start.max(b.start))
}

fn center_distance(a: &LayoutCell, b: &LayoutCell) -> usize {
    (a.start + a.end).abs_diff(b.start + b.end)
}

/// Column a data cell belongs to: the header cell it overlaps most, or the
/// one whose centre is nearest when it overlaps none.
fn assign_column(cell: &LayoutCell, header: &[LayoutCell]) -> usize {
    let best_overlap = header
        .iter()
        .enumerate()
        .map(|(index, column)| (index, overlap(cell, column)))
        .filter(|(_, amount)| *amount > 0)
        .max_by(|left, right| left.1.cmp(&right.1).then(right.0.cmp(&left.0)));

    if let Some((index, _)) = best_overlap {
        return index;
    }

    header
        .iter()
        .enumerate()
        .min_by_key(|(_, column)| center_distance(cell, column))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Reads one page of `pdftotext -layout` output into a table.
///
/// The header line is the first line carrying a `Rank` cell, or the first
/// non-empty line when none does. Text sitting entirely left of the first
/// header cell, such as a page footer, gets its own `Unnamed: 0` column.
pub fn parse_layout_page(text: &str) -> RawTable {
    let lines = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<&str>>();

    let header_index = lines
        .iter()
        .position(|line| {
            split_layout_cells(line)
                .iter()
                .any(|cell| cell.text == RANK_COLUMN)
        })
        .unwrap_or(0);

    let Some(header_line) = lines.get(header_index) else {
        return RawTable::default();
    };

    let mut header = split_layout_cells(header_line);
    let data_lines = lines[header_index + 1..]
        .iter()
        .map(|line| split_layout_cells(line))
        .collect::<Vec<Vec<LayoutCell>>>();

    let first_start = header.first().map(|cell| cell.start).unwrap_or(0);
    let has_leading_text = data_lines
        .iter()
        .flatten()
        .any(|cell| cell.end <= first_start);
    if has_leading_text {
        header.insert(
            0,
            LayoutCell {
                start: 0,
                end: first_start,
                text: format!("{PLACEHOLDER_PREFIX}: 0"),
            },
        );
    }

    let columns = header
        .iter()
        .map(|cell| cell.text.clone())
        .collect::<Vec<String>>();

    let rows = data_lines
        .iter()
        .map(|cells| {
            let mut row = vec![String::new(); header.len()];
            for cell in cells {
                let slot = &mut row[assign_column(cell, &header)];
                if !slot.is_empty() {
                    slot.push(' ');
                }
                slot.push_str(&cell.text);
            }
            row
        })
        .collect();

    RawTable { columns, rows }
}

/// Stacks per-page tables, lining columns up by name in first-seen order.
pub fn concat_tables(pages: Vec<RawTable>) -> RawTable {
    let mut columns = Vec::<String>::new();
    let mut positions = HashMap::<String, usize>::new();
    for page in &pages {
        for column in &page.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for page in pages {
        let targets = page
            .columns
            .iter()
            .map(|column| positions[column])
            .collect::<Vec<usize>>();
        for cells in page.rows {
            let mut row = vec![String::new(); columns.len()];
            for (cell, target) in cells.into_iter().zip(&targets) {
                row[*target] = cell;
            }
            rows.push(row);
        }
    }

    RawTable { columns, rows }
}

fn is_placeholder_column(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with(PLACEHOLDER_PREFIX)
}

fn require_column(table: &RawTable, name: &'static str) -> Result<usize, TableError> {
    table
        .column_index(name)
        .ok_or(TableError::MissingColumn(name))
}

/// Cleans a scraped ranking table down to the five kept fields.
///
/// Filler pages (an all-empty `FD` column) yield no rows. Unplaced entries
/// and rows without a rank are dropped; anything left must carry an
/// integer rank and numeric points.
pub fn clean_table(mut table: RawTable) -> Result<Vec<CleanRow>, TableError> {
    if let Some(fd) = table.column_index(FILLER_MARKER_COLUMN)
        && table.rows.iter().all(|row| {
            row.get(fd)
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
    {
        return Ok(Vec::new());
    }

    // A margin column beside a recognised `Rank` header is not a lost header.
    if table
        .columns
        .first()
        .map(|name| is_placeholder_column(name))
        .unwrap_or(false)
        && table.column_index(RANK_COLUMN).is_none()
        && !table.rows.is_empty()
    {
        table.columns = table.rows.remove(0);
    }

    let rank = require_column(&table, RANK_COLUMN)?;
    let competitor = COMPETITOR_COLUMNS
        .iter()
        .find_map(|name| table.column_index(name))
        .ok_or(TableError::MissingColumn(COMPETITOR_COLUMNS[0]))?;
    let club = require_column(&table, CLUB_COLUMN)?;
    let section = require_column(&table, SECTION_COLUMN)?;
    let points = require_column(&table, POINTS_COLUMN)?;

    let mut cleaned = Vec::new();
    for index in 0..table.rows.len() {
        let rank_value = table.cell(index, rank).trim();
        if rank_value.is_empty() || NON_PLACEMENT_RANKS.contains(&rank_value) {
            continue;
        }

        cleaned.push(CleanRow {
            rank: parse_rank(rank_value)?,
            competitor: table.cell(index, competitor).trim().to_string(),
            club: table.cell(index, club).trim().to_string(),
            section: table.cell(index, section).trim().to_string(),
            points: parse_points(table.cell(index, points).trim())?,
        });
    }

    Ok(cleaned)
}

fn parse_rank(value: &str) -> Result<u32, TableError> {
    let invalid = || TableError::InvalidRank(value.to_string());

    let rank = match value.parse::<u32>() {
        Ok(rank) => rank,
        Err(_) => {
            let float = value.parse::<f64>().map_err(|_| invalid())?;
            if float.fract() != 0.0 || !(1.0..=f64::from(u32::MAX)).contains(&float) {
                return Err(invalid());
            }
            float as u32
        }
    };

    if rank == 0 {
        return Err(invalid());
    }
    Ok(rank)
}

fn parse_points(value: &str) -> Result<f64, TableError> {
    let points = value
        .parse::<f64>()
        .ok()
        .filter(|points| points.is_finite())
        .ok_or_else(|| TableError::InvalidPoints(value.to_string()))?;
    Ok(round_to_hundredths(points))
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|value| value.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|value| value.to_string()).collect())
                .collect(),
        }
    }

    const COLUMNS: &[&str] = &["Rank", "Competitor(s)", "Club", "Section", "Points", "SS"];

    #[test]
    fn clean_table_drops_unplaced_and_unranked_rows() {
        let raw = table(
            COLUMNS,
            &[
                &["1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "45.678", "20.1"],
                &["WD", "Bea Jones", "Edmonton SC", "AB/NT/NU", "", ""],
                &["2", "Cleo Brown", "Calgary FSC", "AB/NT/NU", "40.1", "19.0"],
                &["DQ", "Dee Green", "Red Deer SC", "AB/NT/NU", "", ""],
                &["3", "Eve White", "Banff FSC", "BC/YT", "38", "18.5"],
                &["", "Referee: J. Doe", "", "", "", ""],
                &["MD", "", "", "", "", ""],
            ],
        );

        let rows = clean_table(raw).expect("table should clean");

        assert_eq!(rows.iter().map(|row| row.rank).collect::<Vec<u32>>(), vec![1, 2, 3]);
        assert_eq!(rows[0].competitor, "Ava Smith");
        assert_eq!(rows[0].points, 45.68);
        assert_eq!(rows[2].section, "BC/YT");
        assert_eq!(rows[2].points, 38.0);
    }

    #[test]
    fn empty_filler_marker_column_yields_no_rows() {
        let raw = table(
            &["Rank", "Competitor(s)", "Club", "Section", "Points", "FD"],
            &[&["1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "45.67", " "]],
        );
        assert!(clean_table(raw).expect("filler page is not an error").is_empty());

        let scored = table(
            &["Rank", "Competitor(s)", "Club", "Section", "Points", "FD"],
            &[&["1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "45.67", "30.1"]],
        );
        assert_eq!(clean_table(scored).expect("scored page cleans").len(), 1);
    }

    #[test]
    fn placeholder_header_promotes_first_row() {
        let raw = table(
            &["Unnamed: 0", "Unnamed: 1", "Unnamed: 2", "Unnamed: 3", "Unnamed: 4"],
            &[
                &["Rank", "Competitor(s)", "Club", "Section", "Points"],
                &["1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "12.5"],
            ],
        );

        let rows = clean_table(raw).expect("promoted header cleans");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].club, "Calgary FSC");
        assert_eq!(rows[0].points, 12.5);
    }

    #[test]
    fn malformed_values_fail_the_table() {
        let missing = table(&["Rank", "Competitor(s)", "Club", "Points"], &[]);
        assert_eq!(
            clean_table(missing),
            Err(TableError::MissingColumn(SECTION_COLUMN))
        );

        let bad_rank = table(COLUMNS, &[&["1st", "Ava", "C", "S", "1.0", ""]]);
        assert_eq!(
            clean_table(bad_rank),
            Err(TableError::InvalidRank("1st".to_string()))
        );

        let bad_points = table(COLUMNS, &[&["1", "Ava", "C", "S", "n/a", ""]]);
        assert_eq!(
            clean_table(bad_points),
            Err(TableError::InvalidPoints("n/a".to_string()))
        );
    }

    #[test]
    fn parse_rank_accepts_integral_floats_only() {
        assert_eq!(parse_rank("4"), Ok(4));
        assert_eq!(parse_rank("7.0"), Ok(7));
        assert!(parse_rank("0").is_err());
        assert!(parse_rank("2.5").is_err());
    }

    #[test]
    fn parse_layout_page_aligns_cells_under_headers() {
        let text = "\
Category Results Summary
Rank  Competitor(s)         Club               Section     Points   FD
   1  Ava Smith             Calgary FSC        AB/NT/NU     45.67   30.10
   2  Bea Jones             Edmonton SC                     40.10   28.00
  WD  Cleo Brown            Banff FSC          BC/YT
";

        let table = parse_layout_page(text);

        assert_eq!(
            table.columns,
            vec!["Rank", "Competitor(s)", "Club", "Section", "Points", "FD"]
        );
        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.rows[0],
            vec!["1", "Ava Smith", "Calgary FSC", "AB/NT/NU", "45.67", "30.10"]
        );
        assert_eq!(table.rows[1][3], "");
        assert_eq!(table.rows[1][4], "40.10");
        assert_eq!(table.rows[2][0], "WD");
        assert_eq!(table.rows[2][4], "");
    }

    #[test]
    fn left_margin_footer_keeps_the_recognised_header() {
        let text = [
            "            Rank  Competitor(s)   Club          Section    Points",
            "               1  Ava Smith       Calgary FSC   AB/NT/NU    45.67",
            "               2  Bea Jones       Glencoe Club  AB/NT/NU    40.10",
            "Page 1",
        ]
        .join("\n");

        let table = parse_layout_page(&text);
        assert_eq!(
            table.columns,
            vec!["Unnamed: 0", "Rank", "Competitor(s)", "Club", "Section", "Points"]
        );
        assert_eq!(table.rows[2][0], "Page 1");

        let rows = clean_table(table).expect("footer must not displace the header");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].competitor, "Ava Smith");
        assert_eq!(rows[1].club, "Glencoe Club");
        assert_eq!(rows[1].points, 40.1);
    }

    #[test]
    fn concat_tables_aligns_columns_by_name() {
        let first = table(&["Rank", "Points"], &[&["1", "10.0"]]);
        let second = table(&["Rank", "FD", "Points"], &[&["2", "3.0", "9.0"]]);

        let merged = concat_tables(vec![first, second]);

        assert_eq!(merged.columns, vec!["Rank", "Points", "FD"]);
        assert_eq!(merged.rows[0], vec!["1", "10.0", ""]);
        assert_eq!(merged.rows[1], vec!["2", "9.0", "3.0"]);
    }
}
