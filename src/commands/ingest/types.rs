use std::collections::HashMap;

use thiserror::Error;

/// Surrogate key: the zero-based position of a row in its table.
pub type Id = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryType {
    Competitive,
    Adult,
    SpecialOlympics,
    StarSkate,
}

impl CategoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryType::Competitive => "Competitive",
            CategoryType::Adult => "Adult",
            CategoryType::SpecialOlympics => "Special Olympics",
            CategoryType::StarSkate => "STARSkate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgramType {
    CreativeSkatingSkill,
    Triathalon,
    Elements,
    SpecialOlympics,
    ShortProgram,
    FreeProgram,
    Artistic,
    Combined,
}

impl ProgramType {
    /// Fixed table order; a program type's id is its index here.
    pub const ALL: [ProgramType; 8] = [
        ProgramType::CreativeSkatingSkill,
        ProgramType::Triathalon,
        ProgramType::Elements,
        ProgramType::SpecialOlympics,
        ProgramType::ShortProgram,
        ProgramType::FreeProgram,
        ProgramType::Artistic,
        ProgramType::Combined,
    ];

    pub fn id(self) -> Id {
        self as Id
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgramType::CreativeSkatingSkill => "Creative Skating Skill",
            ProgramType::Triathalon => "Triathalon",
            ProgramType::Elements => "Elements",
            ProgramType::SpecialOlympics => "Special Olympics",
            ProgramType::ShortProgram => "Short Program",
            ProgramType::FreeProgram => "Free Program",
            ProgramType::Artistic => "Artistic",
            ProgramType::Combined => "Combined",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Competition {
    pub name: String,
    pub start_date: String,
    pub season: Option<String>,
    pub is_championship: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub category_type: CategoryType,
    pub program_type: ProgramType,
}

/// One placement in the fact table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub competition_id: Id,
    pub category_id: Id,
    pub club_id: Option<Id>,
    pub competitor_id: Option<Id>,
    pub section_id: Option<Id>,
    pub rank: u32,
    pub points: f64,
}

/// Append-only table with a name index; ids are insertion positions.
#[derive(Debug, Clone)]
pub struct Dimension<T> {
    rows: Vec<T>,
    index: HashMap<String, Id>,
}

impl<T> Default for Dimension<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Dimension<T> {
    /// Returns the id already bound to `key`, or appends `make()` under the
    /// next id. The flag is true when a row was appended.
    pub fn resolve_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> T) -> (Id, bool) {
        if let Some(id) = self.index.get(key) {
            return (*id, false);
        }

        let id = self.rows.len();
        self.rows.push(make());
        self.index.insert(key.to_string(), id);
        (id, true)
    }

    #[cfg(test)]
    pub fn id_of(&self, key: &str) -> Option<Id> {
        self.index.get(key).copied()
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

impl Dimension<String> {
    pub fn resolve_name(&mut self, name: &str) -> Id {
        self.resolve_or_insert_with(name, || name.to_string()).0
    }
}

/// Everything accumulated over one batch run.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub competitions: Dimension<Competition>,
    pub categories: Dimension<Category>,
    pub clubs: Dimension<String>,
    pub sections: Dimension<String>,
    pub competitors: Dimension<String>,
    pub results: Vec<ResultRow>,
}

/// Header fields after name normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub competition_name: String,
    pub start_date: String,
    pub category_name: String,
}

/// A ranking row projected to the five fields the dataset keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub rank: u32,
    pub competitor: String,
    pub club: String,
    pub section: String,
    pub points: f64,
}

/// Table cells as scraped, before cleaning. Missing cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.trim() == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Page crop in PDF points, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRegion {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

/// Ranking table area on the federation's result summary layout.
pub const RESULTS_REGION: PageRegion = PageRegion {
    top: 130.0,
    left: 13.0,
    bottom: 522.0,
    right: 775.0,
};

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("results table has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("rank '{0}' is not a positive integer")]
    InvalidRank(String),
    #[error("points value '{0}' is not numeric")]
    InvalidPoints(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error("header parse failed: {0}")]
    Header(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

impl DocumentError {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentError::Extraction(_) => "extraction",
            DocumentError::Header(_) => "header",
            DocumentError::Table(_) => "table",
        }
    }
}
